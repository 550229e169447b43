pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use cadence_core::config::{AppConfig, ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "cadence",
    about = "Cadence operator CLI",
    long_about = "Classify customers, forecast demand, and schedule reorder reminders over the storefront database.",
    after_help = "Examples:\n  cadence migrate\n  cadence seed\n  cadence classify --run-date 2025-08-01\n  cadence remind --campaign reorder --dry-run"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a cadence.toml config file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Override database URL")]
    database_url: Option<String>,

    #[arg(long, global = true, help = "Override log level (trace..error)")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset into a migrated database")]
    Seed,
    #[command(about = "Classify and segment every customer as of the run date")]
    Classify {
        #[arg(long, help = "Reference date for recency math (defaults to today)")]
        run_date: Option<NaiveDate>,
    },
    #[command(about = "Forecast demand/spend and derive offer decisions")]
    Forecast {
        #[arg(long, value_parser = ["products", "customers"], default_value = "products")]
        target: String,
    },
    #[command(about = "Select reorder reminders, honoring per-tier cooldowns")]
    Remind {
        #[arg(long, help = "Run date for due-date matching (defaults to today)")]
        run_date: Option<NaiveDate>,
        #[arg(long, value_parser = ["reorder", "win-back", "follow-up"], default_value = "reorder")]
        campaign: String,
        #[arg(long, help = "Plan without persisting the cooldown ledger")]
        dry_run: bool,
    },
    #[command(about = "Inspect effective configuration values with redacted secrets")]
    Config,
    #[command(about = "Validate config and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let load_options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides {
            database_url: cli.database_url.clone(),
            log_level: cli.log_level.clone(),
            ..ConfigOverrides::default()
        },
    };

    let config = match AppConfig::load(load_options) {
        Ok(config) => config,
        Err(error) => {
            let result = commands::CommandResult::failure(
                "cadence",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
            println!("{}", result.output);
            return ExitCode::from(result.exit_code);
        }
    };

    init_logging(&config);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&config),
        Command::Seed => commands::seed::run(&config),
        Command::Classify { run_date } => commands::classify::run(&config, run_date),
        Command::Forecast { target } => commands::forecast::run(&config, &target),
        Command::Remind { run_date, campaign, dry_run } => {
            commands::remind::run(&config, run_date, &campaign, dry_run)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&config) }
        }
        Command::Doctor { json } => commands::doctor::run(&config, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging(config: &AppConfig) {
    use cadence_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
