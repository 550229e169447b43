//! Campaign assembly: which customers get which template messages, and the
//! dispatcher seam the transport implements.

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use cadence_core::domain::classification::{BehaviorTier, ClassificationRecord};
use cadence_core::domain::customer::{CustomerId, OrderHistory};
use cadence_core::config::WhatsAppConfig;
use cadence_core::reorder::ReminderSelection;

use crate::payload::TemplateMessage;
use crate::phone::dispatchable_number;
use crate::templates::{Audience, Language, TemplateCatalog};

/// One message ready for the transport.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlannedDispatch {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub audience: Audience,
    pub language: Language,
    pub message: TemplateMessage,
}

/// Why a customer was left out of a campaign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CampaignSkip {
    MissingPhone,
    UndialablePhone { raw: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CampaignPlan {
    pub audience: Audience,
    pub dispatches: Vec<PlannedDispatch>,
    pub skipped: Vec<(CustomerId, CampaignSkip)>,
}

impl CampaignPlan {
    fn new(audience: Audience) -> Self {
        Self { audience, dispatches: Vec::new(), skipped: Vec::new() }
    }

    /// Add one customer: a dispatch per language, or a skip.
    fn add_customer(
        &mut self,
        customer_id: CustomerId,
        customer_name: &str,
        phone: Option<&str>,
        catalog: &TemplateCatalog,
        whatsapp: &WhatsAppConfig,
    ) {
        let Some(raw) = phone else {
            self.skipped.push((customer_id, CampaignSkip::MissingPhone));
            return;
        };
        let Some(to) = dispatchable_number(raw, whatsapp) else {
            self.skipped
                .push((customer_id, CampaignSkip::UndialablePhone { raw: raw.to_string() }));
            return;
        };

        for language in Language::ALL {
            let template = catalog.resolve(self.audience, language);
            self.dispatches.push(PlannedDispatch {
                customer_id,
                customer_name: customer_name.to_string(),
                audience: self.audience,
                language,
                message: TemplateMessage::new(
                    to.clone(),
                    template.name.clone(),
                    template.language_code.clone(),
                    vec![customer_name.to_string()],
                ),
            });
        }
    }
}

/// Win-back plan: every Dead customer with a dialable phone.
pub fn win_back_campaign(
    records: &[ClassificationRecord],
    catalog: &TemplateCatalog,
    whatsapp: &WhatsAppConfig,
) -> CampaignPlan {
    let mut plan = CampaignPlan::new(Audience::DeadCustomerWinBack);
    for record in records.iter().filter(|r| r.behavior_tier == BehaviorTier::Dead) {
        plan.add_customer(
            record.customer_id,
            &record.customer_name,
            record.phone.as_deref(),
            catalog,
            whatsapp,
        );
    }
    plan
}

/// Reminder plan from the cooldown scheduler's selections.
pub fn reorder_campaign(
    selections: &[ReminderSelection],
    catalog: &TemplateCatalog,
    whatsapp: &WhatsAppConfig,
) -> CampaignPlan {
    let mut plan = CampaignPlan::new(Audience::ReorderReminder);
    for selection in selections {
        plan.add_customer(
            selection.customer_id,
            &selection.customer_name,
            selection.phone.as_deref(),
            catalog,
            whatsapp,
        );
    }
    plan
}

/// Follow-up plan: customers with a qualifying order exactly one calendar
/// month before `run_date`.
pub fn follow_up_campaign(
    records: &[ClassificationRecord],
    histories: &std::collections::HashMap<CustomerId, OrderHistory>,
    run_date: NaiveDate,
    catalog: &TemplateCatalog,
    whatsapp: &WhatsAppConfig,
) -> CampaignPlan {
    let mut plan = CampaignPlan::new(Audience::OneMonthFollowUp);
    for record in records {
        let due = histories
            .get(&record.customer_id)
            .map(|history| {
                history
                    .order_dates
                    .iter()
                    .any(|d| d.checked_add_months(Months::new(1)) == Some(run_date))
            })
            .unwrap_or(false);
        if due {
            plan.add_customer(
                record.customer_id,
                &record.customer_name,
                record.phone.as_deref(),
                catalog,
                whatsapp,
            );
        }
    }
    plan
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("provider rejected message: {0}")]
    Provider(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// The transport seam. The binary wires in a real HTTP client; tests wire in
/// fakes.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn dispatch(&self, message: &TemplateMessage) -> Result<(), DispatchError>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub customer_id: CustomerId,
    pub language: Language,
    pub delivered: bool,
    pub detail: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CampaignReport {
    pub audience: Audience,
    pub outcomes: Vec<DispatchOutcome>,
    pub skipped: Vec<(CustomerId, CampaignSkip)>,
}

impl CampaignReport {
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.delivered).count()
    }
}

/// Execute a plan. One failed send never stops the rest.
pub async fn run_campaign(
    plan: CampaignPlan,
    dispatcher: &dyn MessageDispatcher,
) -> CampaignReport {
    let mut outcomes = Vec::with_capacity(plan.dispatches.len());
    for dispatch in &plan.dispatches {
        match dispatcher.dispatch(&dispatch.message).await {
            Ok(()) => {
                info!(
                    event_name = "message_dispatched",
                    customer_id = %dispatch.customer_id,
                    audience = ?dispatch.audience,
                    language = ?dispatch.language,
                );
                outcomes.push(DispatchOutcome {
                    customer_id: dispatch.customer_id,
                    language: dispatch.language,
                    delivered: true,
                    detail: None,
                });
            }
            Err(err) => {
                warn!(
                    event_name = "message_dispatch_failed",
                    customer_id = %dispatch.customer_id,
                    audience = ?dispatch.audience,
                    error = %err,
                );
                outcomes.push(DispatchOutcome {
                    customer_id: dispatch.customer_id,
                    language: dispatch.language,
                    delivered: false,
                    detail: Some(err.to_string()),
                });
            }
        }
    }

    CampaignReport { audience: plan.audience, outcomes, skipped: plan.skipped }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use super::*;
    use cadence_core::domain::classification::{ChurnRisk, Segment, SpendTier};
    use cadence_core::AppConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(
        id: i64,
        name: &str,
        phone: Option<&str>,
        tier: BehaviorTier,
    ) -> ClassificationRecord {
        ClassificationRecord {
            customer_id: CustomerId(id),
            customer_name: name.to_string(),
            phone: phone.map(str::to_string),
            order_count: 1,
            total_spent: Decimal::from(40),
            last_order_date: Some(date(2024, 5, 1)),
            behavior_tier: tier,
            churn_risk: ChurnRisk::High,
            spend_tier: SpendTier::LowSpender,
            segment: Segment::Unsegmented,
        }
    }

    struct RecordingDispatcher {
        sent: Mutex<Vec<String>>,
        fail_number: Option<String>,
    }

    #[async_trait]
    impl MessageDispatcher for RecordingDispatcher {
        async fn dispatch(&self, message: &TemplateMessage) -> Result<(), DispatchError> {
            if self.fail_number.as_deref() == Some(message.to.as_str()) {
                return Err(DispatchError::Provider("blocked number".to_string()));
            }
            self.sent
                .lock()
                .expect("lock")
                .push(format!("{}:{}", message.to, message.template.name));
            Ok(())
        }
    }

    #[test]
    fn win_back_targets_dead_customers_with_dialable_phones() {
        let config = AppConfig::default();
        let records = vec![
            record(1, "Faris", None, BehaviorTier::Dead),
            record(2, "Dana", Some("98765432"), BehaviorTier::Dead),
            record(3, "Amal", Some("96598765432"), BehaviorTier::Loyal),
            record(4, "Hadi", Some("12"), BehaviorTier::Dead),
        ];
        let plan = win_back_campaign(&records, &TemplateCatalog::default(), &config.whatsapp);

        // Dana only, in both languages.
        assert_eq!(plan.dispatches.len(), 2);
        assert!(plan.dispatches.iter().all(|d| d.customer_id == CustomerId(2)));
        assert!(plan.dispatches.iter().all(|d| d.message.to == "96598765432"));
        assert_eq!(
            plan.skipped,
            vec![
                (CustomerId(1), CampaignSkip::MissingPhone),
                (CustomerId(4), CampaignSkip::UndialablePhone { raw: "12".to_string() }),
            ]
        );
    }

    #[test]
    fn follow_up_fires_exactly_one_month_after_an_order() {
        let config = AppConfig::default();
        let records = vec![
            record(1, "Eman", Some("96555511122"), BehaviorTier::New),
            record(2, "Dana", Some("96555512345"), BehaviorTier::Occasional),
        ];
        let histories: HashMap<CustomerId, OrderHistory> = [
            (CustomerId(1), OrderHistory::new(CustomerId(1), vec![date(2025, 6, 15)])),
            (CustomerId(2), OrderHistory::new(CustomerId(2), vec![date(2025, 6, 20)])),
        ]
        .into();

        let plan = follow_up_campaign(
            &records,
            &histories,
            date(2025, 7, 15),
            &TemplateCatalog::default(),
            &config.whatsapp,
        );
        assert_eq!(plan.dispatches.len(), 2);
        assert!(plan.dispatches.iter().all(|d| d.customer_id == CustomerId(1)));
    }

    #[tokio::test]
    async fn one_failed_send_does_not_stop_the_campaign() {
        let config = AppConfig::default();
        let records = vec![
            record(1, "Faris", Some("96511112222"), BehaviorTier::Dead),
            record(2, "Dana", Some("96533334444"), BehaviorTier::Dead),
        ];
        let plan = win_back_campaign(&records, &TemplateCatalog::default(), &config.whatsapp);

        let dispatcher = RecordingDispatcher {
            sent: Mutex::new(Vec::new()),
            fail_number: Some("96511112222".to_string()),
        };
        let report = run_campaign(plan, &dispatcher).await;

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.delivered_count(), 2);
        let failed: Vec<_> =
            report.outcomes.iter().filter(|o| !o.delivered).map(|o| o.customer_id).collect();
        assert_eq!(failed, vec![CustomerId(1), CustomerId(1)]);
    }
}
