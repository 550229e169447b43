use cadence_cli::commands::{classify, forecast, migrate, remind, seed};
use cadence_core::config::AppConfig;
use chrono::NaiveDate;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_then_seed_reports_dataset_summary() {
    let workspace = TempDir::new().expect("temp dir should be creatable");
    let config = file_backed_config(&workspace);

    let migrated = migrate::run(&config);
    assert_eq!(migrated.exit_code, 0, "expected successful migrate run");
    let payload = parse_payload(&migrated.output);
    assert_eq!(payload["command"], "migrate");
    assert_eq!(payload["status"], "ok");

    let seeded = seed::run(&config);
    assert_eq!(seeded.exit_code, 0, "expected successful seed run");
    let payload = parse_payload(&seeded.output);
    assert_eq!(payload["command"], "seed");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["customers"], 8);
    assert_eq!(payload["data"]["products"], 4);
}

#[test]
fn seed_is_idempotent_across_runs() {
    let workspace = TempDir::new().expect("temp dir should be creatable");
    let config = file_backed_config(&workspace);

    let first = seed::run(&config);
    assert_eq!(first.exit_code, 0, "expected first seed invocation success");
    let second = seed::run(&config);
    assert_eq!(second.exit_code, 0, "expected second seed invocation success");

    let first_payload = parse_payload(&first.output);
    let second_payload = parse_payload(&second.output);
    assert_eq!(first_payload["data"], second_payload["data"]);
}

#[test]
fn classify_over_seeded_database_reports_every_customer() {
    let workspace = TempDir::new().expect("temp dir should be creatable");
    let config = file_backed_config(&workspace);
    assert_eq!(seed::run(&config).exit_code, 0);

    let run_date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
    let classified = classify::run(&config, Some(run_date));
    assert_eq!(classified.exit_code, 0, "expected successful classify run");

    let payload = parse_payload(&classified.output);
    assert_eq!(payload["command"], "classify");
    assert_eq!(payload["status"], "ok");
    let records = payload["data"]["records"].as_array().expect("records array");
    assert_eq!(records.len(), 8);
}

#[test]
fn forecast_over_seeded_database_succeeds() {
    let workspace = TempDir::new().expect("temp dir should be creatable");
    let config = file_backed_config(&workspace);
    assert_eq!(seed::run(&config).exit_code, 0);

    let forecasted = forecast::run(&config, "products");
    assert_eq!(forecasted.exit_code, 0, "expected successful forecast run");
    let payload = parse_payload(&forecasted.output);
    assert_eq!(payload["command"], "forecast");
    assert_eq!(payload["status"], "ok");
}

#[test]
fn remind_dry_run_leaves_the_cooldown_ledger_empty() {
    let workspace = TempDir::new().expect("temp dir should be creatable");
    let config = file_backed_config(&workspace);
    assert_eq!(seed::run(&config).exit_code, 0);

    let run_date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
    let planned = remind::run(&config, Some(run_date), "reorder", true);
    assert_eq!(planned.exit_code, 0, "expected successful remind dry run");

    let payload = parse_payload(&planned.output);
    assert_eq!(payload["command"], "remind");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["dry_run"], true);
}

#[test]
fn unreachable_database_maps_to_connectivity_failure() {
    let mut config = AppConfig::default();
    config.database.url = "sqlite:///nonexistent-dir/cadence.db".to_string();

    let result = migrate::run(&config);
    assert_eq!(result.exit_code, 4, "expected connectivity failure code");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "db_connectivity");
}

fn file_backed_config(workspace: &TempDir) -> AppConfig {
    let db_path = workspace.path().join("cadence.db");
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());
    config
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}
