//! Read surface for the analytics pipeline. One trait, two implementations:
//! SQL against the storefront schema and an in-memory twin for tests.
//!
//! Aggregation itself happens in Rust over thin row fetches, so Decimal
//! amounts never round-trip through SQLite's float arithmetic and both
//! implementations share one set of rules.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use cadence_core::domain::customer::{
    CustomerAggregate, CustomerId, OrderHistory, ProductQuantity,
};
use cadence_core::domain::product::{DemandPoint, ProductAggregate, ProductId};
use cadence_core::reorder::CooldownState;

pub mod analytics;
pub mod memory;

pub use analytics::SqlAnalyticsRepository;
pub use memory::InMemoryAnalyticsRepository;

/// Order statuses that count toward aggregates and histories.
pub const QUALIFYING_STATUSES: &[&str] = &["completed", "processing"];

/// Purchase summaries consider fulfilled orders only.
pub const COMPLETED_STATUS: &str = "completed";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Per-customer order count, qualifying spend, and last order date.
    /// Customers without orders appear with zeroed aggregates.
    async fn customer_aggregates(&self) -> Result<Vec<CustomerAggregate>, RepositoryError>;

    /// Qualifying order dates per customer, ascending.
    async fn order_histories(&self)
        -> Result<HashMap<CustomerId, OrderHistory>, RepositoryError>;

    /// Per-product sales aggregates over qualifying orders.
    async fn product_aggregates(&self) -> Result<Vec<ProductAggregate>, RepositoryError>;

    /// Per-product (date, units) observations for demand forecasting.
    async fn product_demand(
        &self,
    ) -> Result<Vec<(ProductId, Vec<DemandPoint>)>, RepositoryError>;

    /// Per-customer (date, order total) observations for cadence forecasting.
    async fn customer_spend_history(
        &self,
    ) -> Result<Vec<(CustomerId, Vec<DemandPoint>)>, RepositoryError>;

    /// Top products by summed quantity across the customer's completed
    /// orders.
    async fn top_products_for_customer(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> Result<Vec<ProductQuantity>, RepositoryError>;

    /// Reminder cooldown ledger persisted by the previous `remind` run.
    async fn load_reminder_ledger(&self) -> Result<CooldownState, RepositoryError>;

    /// Replace the persisted ledger with `state`.
    async fn save_reminder_ledger(&self, state: &CooldownState)
        -> Result<(), RepositoryError>;
}

/// One customer row as stored.
#[derive(Clone, Debug)]
pub struct CustomerRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl CustomerRow {
    pub fn full_name(&self) -> String {
        let mut name = self.first_name.trim().to_string();
        let last = self.last_name.trim();
        if !last.is_empty() {
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(last);
        }
        name
    }
}

/// One qualifying order row.
#[derive(Clone, Debug)]
pub struct OrderRow {
    pub customer_id: i64,
    pub total_amount: Decimal,
    pub created_at: NaiveDate,
}

/// One order line joined with its order's date and product.
#[derive(Clone, Debug)]
pub struct SaleRow {
    pub product_id: i64,
    pub product_name: String,
    pub order_date: NaiveDate,
    pub quantity: i64,
    pub unit_price: Decimal,
}

pub(crate) fn parse_amount(raw: &str, context: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|err| RepositoryError::Decode(format!("{context}: bad amount `{raw}`: {err}")))
}

/// Fold qualifying orders into per-customer aggregates. Every customer row
/// produces an aggregate even with no orders.
pub(crate) fn build_customer_aggregates(
    customers: &[CustomerRow],
    orders: &[OrderRow],
) -> Vec<CustomerAggregate> {
    let mut by_customer: HashMap<i64, (u32, Decimal, Option<NaiveDate>)> = HashMap::new();
    for order in orders {
        let entry = by_customer.entry(order.customer_id).or_insert((0, Decimal::ZERO, None));
        entry.0 += 1;
        entry.1 += order.total_amount;
        entry.2 = Some(entry.2.map_or(order.created_at, |d: NaiveDate| d.max(order.created_at)));
    }

    customers
        .iter()
        .map(|customer| {
            let (order_count, total_spent, last_order_date) = by_customer
                .get(&customer.id)
                .cloned()
                .unwrap_or((0, Decimal::ZERO, None));
            CustomerAggregate {
                id: CustomerId(customer.id),
                name: customer.full_name(),
                phone: customer.phone.clone(),
                order_count,
                total_spent,
                last_order_date,
            }
        })
        .collect()
}

pub(crate) fn build_order_histories(
    orders: &[OrderRow],
) -> HashMap<CustomerId, OrderHistory> {
    let mut dates: HashMap<i64, Vec<NaiveDate>> = HashMap::new();
    for order in orders {
        dates.entry(order.customer_id).or_default().push(order.created_at);
    }
    dates
        .into_iter()
        .map(|(id, dates)| (CustomerId(id), OrderHistory::new(CustomerId(id), dates)))
        .collect()
}

pub(crate) fn build_product_aggregates(sales: &[SaleRow]) -> Vec<ProductAggregate> {
    struct Acc {
        name: String,
        units: u32,
        revenue: Decimal,
        last_sold: Option<NaiveDate>,
    }

    let mut by_product: BTreeMap<i64, Acc> = BTreeMap::new();
    for sale in sales {
        let acc = by_product.entry(sale.product_id).or_insert_with(|| Acc {
            name: sale.product_name.clone(),
            units: 0,
            revenue: Decimal::ZERO,
            last_sold: None,
        });
        acc.units += sale.quantity.max(0) as u32;
        acc.revenue += sale.unit_price * Decimal::from(sale.quantity.max(0));
        acc.last_sold = Some(acc.last_sold.map_or(sale.order_date, |d| d.max(sale.order_date)));
    }

    by_product
        .into_iter()
        .map(|(id, acc)| {
            let avg_price = if acc.units > 0 {
                acc.revenue / Decimal::from(acc.units)
            } else {
                Decimal::ZERO
            };
            ProductAggregate {
                id: ProductId(id),
                name: acc.name,
                total_units_sold: acc.units,
                total_revenue: acc.revenue,
                avg_price,
                last_sold_date: acc.last_sold,
            }
        })
        .collect()
}

pub(crate) fn build_product_demand(sales: &[SaleRow]) -> Vec<(ProductId, Vec<DemandPoint>)> {
    let mut by_product: BTreeMap<i64, Vec<DemandPoint>> = BTreeMap::new();
    for sale in sales {
        by_product.entry(sale.product_id).or_default().push(DemandPoint {
            date: sale.order_date,
            quantity: sale.quantity.max(0) as f64,
        });
    }
    by_product
        .into_iter()
        .map(|(id, mut points)| {
            points.sort_by_key(|p| p.date);
            (ProductId(id), points)
        })
        .collect()
}

pub(crate) fn build_spend_history(
    orders: &[OrderRow],
) -> Vec<(CustomerId, Vec<DemandPoint>)> {
    use rust_decimal::prelude::ToPrimitive;

    let mut by_customer: BTreeMap<i64, Vec<DemandPoint>> = BTreeMap::new();
    for order in orders {
        by_customer.entry(order.customer_id).or_default().push(DemandPoint {
            date: order.created_at,
            quantity: order.total_amount.to_f64().unwrap_or(0.0),
        });
    }
    by_customer
        .into_iter()
        .map(|(id, mut points)| {
            points.sort_by_key(|p| p.date);
            (CustomerId(id), points)
        })
        .collect()
}

pub(crate) fn build_top_products(sales: &[SaleRow], limit: usize) -> Vec<ProductQuantity> {
    let mut totals: BTreeMap<i64, (String, i64)> = BTreeMap::new();
    for sale in sales {
        let entry = totals
            .entry(sale.product_id)
            .or_insert_with(|| (sale.product_name.clone(), 0));
        entry.1 += sale.quantity.max(0);
    }

    let mut ranked: Vec<ProductQuantity> = totals
        .into_iter()
        .map(|(product_id, (product_name, total_quantity))| ProductQuantity {
            product_id,
            product_name,
            total_quantity,
        })
        .collect();
    // Highest quantity first; product id breaks ties stably.
    ranked.sort_by(|a, b| {
        b.total_quantity.cmp(&a.total_quantity).then(a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}
