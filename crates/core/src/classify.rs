//! Rule-based classification of customers along three independent axes:
//! behavior tier (order frequency), churn risk (recency), and spend tier
//! (cumulative qualifying spend). Thresholds come in through
//! [`crate::config::AnalyticsConfig`] rather than being baked into the rules.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{BehaviorThresholds, ChurnThresholds, SpendThresholds};
use crate::domain::classification::{BehaviorTier, ChurnRisk, SpendTier};
use crate::domain::customer::CustomerAggregate;

#[derive(Clone, Debug)]
pub struct Classifier {
    behavior: BehaviorThresholds,
    churn: ChurnThresholds,
    spend: SpendThresholds,
}

impl Classifier {
    pub fn new(
        behavior: BehaviorThresholds,
        churn: ChurnThresholds,
        spend: SpendThresholds,
    ) -> Self {
        Self { behavior, churn, spend }
    }

    /// First matching rule wins. A single order placed before the configured
    /// cutoff is Dead, not New; zero orders is always NoOrders.
    pub fn behavior_tier(
        &self,
        order_count: u32,
        last_order_date: Option<NaiveDate>,
    ) -> BehaviorTier {
        match order_count {
            0 => BehaviorTier::NoOrders,
            1 => match last_order_date {
                Some(date) if date < self.behavior.cutoff_date => BehaviorTier::Dead,
                _ => BehaviorTier::New,
            },
            n if n <= self.behavior.occasional_max_orders => BehaviorTier::Occasional,
            n if n <= self.behavior.frequent_max_orders => BehaviorTier::Frequent,
            _ => BehaviorTier::Loyal,
        }
    }

    /// An absent last order date is maximal recency, so always High risk.
    pub fn churn_risk(&self, last_order_date: Option<NaiveDate>, today: NaiveDate) -> ChurnRisk {
        let Some(last) = last_order_date else {
            return ChurnRisk::High;
        };
        let recency_days = (today - last).num_days();
        if recency_days < self.churn.low_max_days {
            ChurnRisk::Low
        } else if recency_days < self.churn.medium_max_days {
            ChurnRisk::Medium
        } else {
            ChurnRisk::High
        }
    }

    /// Breakpoints are inclusive on the lower edge, exclusive on the upper.
    pub fn spend_tier(&self, total_spent: Decimal) -> SpendTier {
        if total_spent < self.spend.medium_min {
            SpendTier::LowSpender
        } else if total_spent < self.spend.high_min {
            SpendTier::MediumSpender
        } else if total_spent < self.spend.vip_min {
            SpendTier::HighSpender
        } else {
            SpendTier::Vip
        }
    }

    pub fn classify(
        &self,
        aggregate: &CustomerAggregate,
        today: NaiveDate,
    ) -> (BehaviorTier, ChurnRisk, SpendTier) {
        (
            self.behavior_tier(aggregate.order_count, aggregate.last_order_date),
            self.churn_risk(aggregate.last_order_date, today),
            self.spend_tier(aggregate.total_spent),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;

    fn classifier() -> Classifier {
        let analytics = AnalyticsConfig::default();
        Classifier::new(analytics.behavior, analytics.churn, analytics.spend)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_orders_iff_zero_order_count() {
        let c = classifier();
        assert_eq!(c.behavior_tier(0, None), BehaviorTier::NoOrders);
        assert_eq!(c.behavior_tier(0, Some(date(2025, 6, 1))), BehaviorTier::NoOrders);
        for count in 1..40 {
            assert_ne!(c.behavior_tier(count, None), BehaviorTier::NoOrders);
        }
    }

    #[test]
    fn single_order_before_cutoff_is_dead() {
        let c = classifier();
        assert_eq!(c.behavior_tier(1, Some(date(2024, 12, 31))), BehaviorTier::Dead);
        assert_eq!(c.behavior_tier(1, Some(date(2025, 1, 1))), BehaviorTier::New);
        // Dead takes precedence only at exactly one order.
        assert_eq!(c.behavior_tier(2, Some(date(2024, 12, 31))), BehaviorTier::Occasional);
    }

    #[test]
    fn single_order_with_unknown_date_is_new() {
        assert_eq!(classifier().behavior_tier(1, None), BehaviorTier::New);
    }

    #[test]
    fn order_count_bands() {
        let c = classifier();
        assert_eq!(c.behavior_tier(2, None), BehaviorTier::Occasional);
        assert_eq!(c.behavior_tier(5, None), BehaviorTier::Occasional);
        assert_eq!(c.behavior_tier(6, None), BehaviorTier::Frequent);
        assert_eq!(c.behavior_tier(15, None), BehaviorTier::Frequent);
        assert_eq!(c.behavior_tier(16, None), BehaviorTier::Loyal);
        assert_eq!(c.behavior_tier(1000, None), BehaviorTier::Loyal);
    }

    #[test]
    fn churn_risk_boundaries() {
        let c = classifier();
        let today = date(2025, 7, 1);
        assert_eq!(c.churn_risk(None, today), ChurnRisk::High);
        assert_eq!(c.churn_risk(Some(today), today), ChurnRisk::Low);
        assert_eq!(c.churn_risk(Some(date(2025, 6, 2)), today), ChurnRisk::Low); // 29 days
        assert_eq!(c.churn_risk(Some(date(2025, 6, 1)), today), ChurnRisk::Medium); // 30 days
        assert_eq!(c.churn_risk(Some(date(2025, 4, 3)), today), ChurnRisk::Medium); // 89 days
        assert_eq!(c.churn_risk(Some(date(2025, 4, 2)), today), ChurnRisk::High); // 90 days
    }

    #[test]
    fn spend_tier_boundaries() {
        let c = classifier();
        assert_eq!(c.spend_tier(Decimal::new(4999, 2)), SpendTier::LowSpender); // 49.99
        assert_eq!(c.spend_tier(Decimal::new(5000, 2)), SpendTier::MediumSpender); // 50.00
        assert_eq!(c.spend_tier(Decimal::new(19999, 2)), SpendTier::MediumSpender); // 199.99
        assert_eq!(c.spend_tier(Decimal::new(20000, 2)), SpendTier::HighSpender); // 200.00
        assert_eq!(c.spend_tier(Decimal::new(99999, 2)), SpendTier::HighSpender); // 999.99
        assert_eq!(c.spend_tier(Decimal::new(100000, 2)), SpendTier::Vip); // 1000.00
    }

    #[test]
    fn spend_tier_is_monotonic_in_total_spent() {
        let c = classifier();
        let mut previous = SpendTier::LowSpender;
        for cents in (0..200_000).step_by(777) {
            let tier = c.spend_tier(Decimal::new(cents, 2));
            assert!(tier >= previous, "tier regressed at {cents} cents");
            previous = tier;
        }
    }
}
