use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-product sales aggregate over qualifying orders, recomputed each run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductAggregate {
    pub id: ProductId,
    pub name: String,
    pub total_units_sold: u32,
    pub total_revenue: Decimal,
    pub avg_price: Decimal,
    pub last_sold_date: Option<NaiveDate>,
}

/// One observed demand event: units sold on a given date.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub date: NaiveDate,
    pub quantity: f64,
}
