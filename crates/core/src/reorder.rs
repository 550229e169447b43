//! Reorder reminder selection with per-customer cooldowns.
//!
//! Selection is a pure function of the classification batch, each customer's
//! order history, the run date, and the cooldown ledger carried over from the
//! previous run. Callers own the ledger: they pass the prior state in and
//! persist the returned one, so replaying the same inputs always yields the
//! same selections.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::CooldownConfig;
use crate::domain::classification::{BehaviorTier, ChurnRisk, ClassificationRecord};
use crate::domain::customer::{CustomerId, OrderHistory};

#[derive(Clone, Debug)]
pub struct CooldownPolicy {
    config: CooldownConfig,
}

impl CooldownPolicy {
    pub fn new(config: CooldownConfig) -> Self {
        Self { config }
    }

    /// Loyal customers get the longest breathing room between reminders.
    pub fn days_for(&self, tier: BehaviorTier) -> i64 {
        match tier {
            BehaviorTier::Loyal => self.config.loyal_days,
            BehaviorTier::Frequent => self.config.frequent_days,
            _ => self.config.default_days,
        }
    }
}

/// Last reminder date per customer. Keyed by raw id so the ledger serializes
/// as a flat JSON object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    pub last_contacted: BTreeMap<i64, NaiveDate>,
}

impl CooldownState {
    pub fn last_contact(&self, customer_id: CustomerId) -> Option<NaiveDate> {
        self.last_contacted.get(&customer_id.0).copied()
    }

    fn in_cooldown(&self, customer_id: CustomerId, run_date: NaiveDate, cooldown_days: i64) -> bool {
        match self.last_contact(customer_id) {
            Some(last) => (run_date - last).num_days() < cooldown_days,
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReminderSelection {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub phone: Option<String>,
    pub behavior_tier: BehaviorTier,
    pub predicted_order_date: NaiveDate,
}

/// Why a customer was passed over on this run. Recorded, never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReminderSkip {
    NotCandidateTier { tier: BehaviorTier },
    HighChurnRisk,
    InsufficientGapHistory,
    NotDueToday { predicted: NaiveDate },
    InCooldown { last_contacted: NaiveDate },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReminderRun {
    pub run_date: NaiveDate,
    pub selected: Vec<ReminderSelection>,
    pub skipped: Vec<(CustomerId, ReminderSkip)>,
    pub state: CooldownState,
}

/// Select the customers due for a reorder reminder on `run_date`.
///
/// Candidates are Loyal and Frequent customers at Low or Medium churn risk
/// with at least two orders on file. A candidate fires on the exact day the
/// run date matches their predicted next order date (last order plus mean
/// gap), and only when outside their tier's cooldown window. Selected
/// customers are stamped with `run_date` in the returned state.
pub fn select_reminders(
    records: &[ClassificationRecord],
    histories: &HashMap<CustomerId, OrderHistory>,
    run_date: NaiveDate,
    state: &CooldownState,
    policy: &CooldownPolicy,
) -> ReminderRun {
    let mut selected = Vec::new();
    let mut skipped = Vec::new();
    let mut next_state = state.clone();

    for record in records {
        let tier = record.behavior_tier;
        if !matches!(tier, BehaviorTier::Loyal | BehaviorTier::Frequent) {
            skipped.push((record.customer_id, ReminderSkip::NotCandidateTier { tier }));
            continue;
        }
        if record.churn_risk == ChurnRisk::High {
            skipped.push((record.customer_id, ReminderSkip::HighChurnRisk));
            continue;
        }

        let predicted = histories
            .get(&record.customer_id)
            .and_then(predicted_next_order);
        let Some(predicted) = predicted else {
            skipped.push((record.customer_id, ReminderSkip::InsufficientGapHistory));
            continue;
        };

        if run_date != predicted {
            skipped.push((record.customer_id, ReminderSkip::NotDueToday { predicted }));
            continue;
        }

        let cooldown_days = policy.days_for(tier);
        if next_state.in_cooldown(record.customer_id, run_date, cooldown_days) {
            let last_contacted = next_state
                .last_contact(record.customer_id)
                .unwrap_or(run_date);
            skipped.push((record.customer_id, ReminderSkip::InCooldown { last_contacted }));
            continue;
        }

        next_state.last_contacted.insert(record.customer_id.0, run_date);
        selected.push(ReminderSelection {
            customer_id: record.customer_id,
            customer_name: record.customer_name.clone(),
            phone: record.phone.clone(),
            behavior_tier: tier,
            predicted_order_date: predicted,
        });
    }

    ReminderRun { run_date, selected, skipped, state: next_state }
}

/// Last order plus the mean inter-order gap. Undefined below two orders.
pub fn predicted_next_order(history: &OrderHistory) -> Option<NaiveDate> {
    let last = history.last_order_date()?;
    let gap = history.mean_gap_days()?;
    last.checked_add_days(Days::new(gap.max(0) as u64))
}

/// Run selection on consecutive dates, threading the ledger between days.
/// Returns one run per date.
pub fn simulate_days(
    records: &[ClassificationRecord],
    histories: &HashMap<CustomerId, OrderHistory>,
    start_date: NaiveDate,
    days: u64,
    initial_state: CooldownState,
    policy: &CooldownPolicy,
) -> Vec<ReminderRun> {
    let mut state = initial_state;
    let mut runs = Vec::new();
    for offset in 0..days {
        let Some(run_date) = start_date.checked_add_days(Days::new(offset)) else {
            break;
        };
        let run = select_reminders(records, histories, run_date, &state, policy);
        state = run.state.clone();
        runs.push(run);
    }
    runs
}
