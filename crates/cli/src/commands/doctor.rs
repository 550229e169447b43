use secrecy::ExposeSecret;
use serde::Serialize;

use cadence_core::config::AppConfig;
use cadence_db::{connect, migrations};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config: &AppConfig, json_output: bool) -> CommandResult {
    let report = build_report(config);
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed: {}\"}}",
                error.to_string().replace('"', "'")
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config: &AppConfig) -> DoctorReport {
    let checks = vec![
        DoctorCheck {
            name: "config_validation",
            status: CheckStatus::Pass,
            details: "configuration loaded and validated".to_string(),
        },
        check_whatsapp_readiness(config),
        check_database(config),
    ];

    let overall_status = checks
        .iter()
        .map(|check| check.status)
        .fold(CheckStatus::Pass, |acc, status| match (acc, status) {
            (CheckStatus::Fail, _) | (_, CheckStatus::Fail) => CheckStatus::Fail,
            (CheckStatus::Warn, _) | (_, CheckStatus::Warn) => CheckStatus::Warn,
            _ => CheckStatus::Pass,
        });
    let summary = match overall_status {
        CheckStatus::Pass => "doctor: all readiness checks passed".to_string(),
        CheckStatus::Warn => "doctor: readiness checks passed with warnings".to_string(),
        CheckStatus::Fail => "doctor: one or more readiness checks failed".to_string(),
    };

    DoctorReport { overall_status, summary, checks }
}

/// Dispatch credentials are optional for analytics commands, so an unset
/// token is a warning rather than a failure.
fn check_whatsapp_readiness(config: &AppConfig) -> DoctorCheck {
    let token_set = !config.whatsapp.access_token.expose_secret().is_empty();
    let id_set = !config.whatsapp.phone_number_id.is_empty();
    match (token_set, id_set) {
        (true, true) => DoctorCheck {
            name: "whatsapp_readiness",
            status: CheckStatus::Pass,
            details: "access token and phone number id are set".to_string(),
        },
        _ => DoctorCheck {
            name: "whatsapp_readiness",
            status: CheckStatus::Warn,
            details: "dispatch credentials unset; remind campaigns will plan but not send"
                .to_string(),
        },
    }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let outcome = runtime.block_on(async {
        let pool = connect(&config.database).await.map_err(|error| error.to_string())?;
        let applied = migrations::MIGRATOR.iter().count();
        pool.close().await;
        Ok::<usize, String>(applied)
    });

    match outcome {
        Ok(migration_count) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!(
                "connected to {}; {migration_count} migrations tracked",
                config.database.url
            ),
        },
        Err(details) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Fail,
            details,
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "FAIL",
        };
        lines.push(format!("  [{marker}] {} - {}", check.name, check.details));
    }
    lines.join("\n")
}
