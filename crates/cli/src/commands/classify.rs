use chrono::{NaiveDate, Utc};

use cadence_core::config::AppConfig;
use cadence_core::pipeline::AnalyticsPipeline;
use cadence_db::{connect, AnalyticsRepository, SqlAnalyticsRepository};

use crate::commands::{build_runtime, CommandResult};

pub fn run(config: &AppConfig, run_date: Option<NaiveDate>) -> CommandResult {
    let runtime = match build_runtime("classify") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let run_date = run_date.unwrap_or_else(|| Utc::now().date_naive());

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let repo = SqlAnalyticsRepository::new(pool);
        let aggregates = repo
            .customer_aggregates()
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;

        let pipeline = AnalyticsPipeline::new(&config.analytics);
        let run = pipeline.classify_customers(&aggregates, run_date);

        let product_aggregates = repo
            .product_aggregates()
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;
        let product_segments = pipeline.segment_products(&product_aggregates, run_date);

        Ok::<_, (&'static str, String, u8)>((run, product_segments))
    });

    match result {
        Ok((run, product_segments)) => {
            let data = serde_json::json!({
                "run_id": run.run_id,
                "run_date": run.run_date,
                "generated_at": run.generated_at,
                "records": run.records,
                "skipped": run.skipped,
                "product_segments": product_segments,
            });
            CommandResult::success_with_data(
                "classify",
                format!("classified {} customers", run.records.len()),
                Some(data),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("classify", error_class, message, exit_code)
        }
    }
}
