use chrono::{NaiveDate, Utc};

use cadence_core::config::AppConfig;
use cadence_core::pipeline::AnalyticsPipeline;
use cadence_core::reorder::{select_reminders, CooldownPolicy};
use cadence_db::{connect, AnalyticsRepository, SqlAnalyticsRepository};
use cadence_dispatch::{
    follow_up_campaign, reorder_campaign, win_back_campaign, CampaignPlan, TemplateCatalog,
};

use crate::commands::{build_runtime, CommandResult};

/// Plan one campaign. `reorder` also threads the cooldown ledger; the others
/// are stateless selections over the classification run.
pub fn run(
    config: &AppConfig,
    run_date: Option<NaiveDate>,
    campaign: &str,
    dry_run: bool,
) -> CommandResult {
    let runtime = match build_runtime("remind") {
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
        let histories = repo
            .order_histories()
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;

        let pipeline = AnalyticsPipeline::new(&config.analytics);
        let classification = pipeline.classify_customers(&aggregates, run_date);
        let catalog = TemplateCatalog::default();

        let (plan, reminder_detail): (CampaignPlan, Option<serde_json::Value>) = match campaign {
            "win-back" => (
                win_back_campaign(&classification.records, &catalog, &config.whatsapp),
                None,
            ),
            "follow-up" => (
                follow_up_campaign(
                    &classification.records,
                    &histories,
                    run_date,
                    &catalog,
                    &config.whatsapp,
                ),
                None,
            ),
            _ => {
                let ledger = repo
                    .load_reminder_ledger()
                    .await
                    .map_err(|error| ("repository", error.to_string(), 5u8))?;
                let policy = CooldownPolicy::new(config.analytics.cooldown.clone());
                let reminder_run = select_reminders(
                    &classification.records,
                    &histories,
                    run_date,
                    &ledger,
                    &policy,
                );
                if !dry_run {
                    repo.save_reminder_ledger(&reminder_run.state)
                        .await
                        .map_err(|error| ("repository", error.to_string(), 5u8))?;
                }
                let detail = serde_json::json!({
                    "selected": reminder_run.selected,
                    "skipped": reminder_run.skipped,
                });
                (
                    reorder_campaign(&reminder_run.selected, &catalog, &config.whatsapp),
                    Some(detail),
                )
            }
        };

        Ok::<_, (&'static str, String, u8)>((plan, reminder_detail))
    });

    match result {
        Ok((plan, reminder_detail)) => {
            let data = serde_json::json!({
                "run_date": run_date,
                "dry_run": dry_run,
                "audience": plan.audience,
                "dispatches": plan.dispatches,
                "skipped": plan.skipped,
                "reminders": reminder_detail,
            });
            CommandResult::success_with_data(
                "remind",
                format!("planned {} dispatches", plan.dispatches.len()),
                Some(data),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("remind", error_class, message, exit_code)
        }
    }
}
