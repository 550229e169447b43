use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;

/// Categorical summary of a customer's order-frequency history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorTier {
    New,
    Dead,
    Occasional,
    Frequent,
    Loyal,
    NoOrders,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnRisk {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendTier {
    LowSpender,
    MediumSpender,
    HighSpender,
    Vip,
}

/// Cluster label assigned by the segmentation engine. Entities excluded from
/// clustering carry `Unsegmented`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Segment {
    Unsegmented,
    Cluster(String),
}

impl Segment {
    pub const UNSEGMENTED: &'static str = "Unsegmented";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unsegmented => Self::UNSEGMENTED,
            Self::Cluster(label) => label,
        }
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        if value == Self::UNSEGMENTED {
            Self::Unsegmented
        } else {
            Self::Cluster(value)
        }
    }
}

impl From<Segment> for String {
    fn from(value: Segment) -> Self {
        value.as_str().to_owned()
    }
}

/// One customer's labels for a single run. Computed fresh each invocation and
/// superseded by the next run's record; never mutated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub phone: Option<String>,
    pub order_count: u32,
    pub total_spent: Decimal,
    pub last_order_date: Option<NaiveDate>,
    pub behavior_tier: BehaviorTier,
    pub churn_risk: ChurnRisk,
    pub spend_tier: SpendTier,
    pub segment: Segment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_round_trips_through_string() {
        let labeled = Segment::Cluster("Cold Leads".to_owned());
        assert_eq!(String::from(labeled.clone()), "Cold Leads");
        assert_eq!(Segment::from("Cold Leads".to_owned()), labeled);
        assert_eq!(Segment::from("Unsegmented".to_owned()), Segment::Unsegmented);
    }

    #[test]
    fn segment_serializes_as_plain_string() {
        let json = serde_json::to_string(&Segment::Unsegmented).unwrap();
        assert_eq!(json, "\"Unsegmented\"");
        let json = serde_json::to_string(&Segment::Cluster("Dormant Customers".into())).unwrap();
        assert_eq!(json, "\"Dormant Customers\"");
    }
}
