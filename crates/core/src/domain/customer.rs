use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-customer order aggregate, recomputed from the order store on every
/// classification pass. Only qualifying order statuses (completed/processing)
/// contribute to `order_count` and `total_spent`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub order_count: u32,
    pub total_spent: Decimal,
    pub last_order_date: Option<NaiveDate>,
}

/// A customer's qualifying order dates, ascending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderHistory {
    pub customer_id: CustomerId,
    pub order_dates: Vec<NaiveDate>,
}

impl OrderHistory {
    pub fn new(customer_id: CustomerId, mut order_dates: Vec<NaiveDate>) -> Self {
        order_dates.sort_unstable();
        Self { customer_id, order_dates }
    }

    pub fn last_order_date(&self) -> Option<NaiveDate> {
        self.order_dates.last().copied()
    }

    /// Mean gap between consecutive orders, in whole days. Undefined for
    /// histories with fewer than two orders.
    pub fn mean_gap_days(&self) -> Option<i64> {
        if self.order_dates.len() < 2 {
            return None;
        }
        let total: i64 = self
            .order_dates
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_days())
            .sum();
        Some(total / (self.order_dates.len() as i64 - 1))
    }
}

/// Quantity-summed product line for a customer's purchase summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductQuantity {
    pub product_id: i64,
    pub product_name: String,
    pub total_quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn order_history_sorts_dates_on_construction() {
        let history = OrderHistory::new(
            CustomerId(1),
            vec![date(2025, 3, 1), date(2025, 1, 1), date(2025, 2, 1)],
        );
        assert_eq!(history.order_dates[0], date(2025, 1, 1));
        assert_eq!(history.last_order_date(), Some(date(2025, 3, 1)));
    }

    #[test]
    fn mean_gap_is_undefined_below_two_orders() {
        assert_eq!(OrderHistory::new(CustomerId(1), vec![]).mean_gap_days(), None);
        assert_eq!(
            OrderHistory::new(CustomerId(1), vec![date(2025, 1, 1)]).mean_gap_days(),
            None
        );
    }

    #[test]
    fn mean_gap_truncates_to_whole_days() {
        // Gaps of 10 and 11 days average to 10 (integer division).
        let history = OrderHistory::new(
            CustomerId(1),
            vec![date(2025, 1, 1), date(2025, 1, 11), date(2025, 1, 22)],
        );
        assert_eq!(history.mean_gap_days(), Some(10));
    }
}
