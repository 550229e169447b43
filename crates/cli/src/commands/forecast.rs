use cadence_core::config::AppConfig;
use cadence_core::pipeline::{AnalyticsPipeline, ForecastRun};
use cadence_db::{connect, AnalyticsRepository, SqlAnalyticsRepository};

use crate::commands::{build_runtime, CommandResult};

pub fn run(config: &AppConfig, target: &str) -> CommandResult {
    let runtime = match build_runtime("forecast") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let repo = SqlAnalyticsRepository::new(pool);
        let pipeline = AnalyticsPipeline::new(&config.analytics);

        let run: ForecastRun = match target {
            "customers" => {
                let spend = repo
                    .customer_spend_history()
                    .await
                    .map_err(|error| ("repository", error.to_string(), 5u8))?;
                pipeline.forecast_customers(&spend)
            }
            _ => {
                let demand = repo
                    .product_demand()
                    .await
                    .map_err(|error| ("repository", error.to_string(), 5u8))?;
                pipeline.forecast_products(&demand)
            }
        };

        Ok::<_, (&'static str, String, u8)>(run)
    });

    match result {
        Ok(run) => {
            let data = serde_json::json!({
                "run_id": run.run_id,
                "generated_at": run.generated_at,
                "offers": run.offers,
                "skipped": run.skipped,
                "forecasts": run.forecasts,
            });
            CommandResult::success_with_data(
                "forecast",
                format!(
                    "{} forecasts, {} offers, {} skipped",
                    run.forecasts.len(),
                    run.offers.len(),
                    run.skipped.len()
                ),
                Some(data),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("forecast", error_class, message, exit_code)
        }
    }
}
