//! In-memory repository mirroring the SQL implementation's semantics for
//! tests that do not need a database file.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use cadence_core::domain::customer::{
    CustomerAggregate, CustomerId, OrderHistory, ProductQuantity,
};
use cadence_core::domain::product::{DemandPoint, ProductAggregate, ProductId};
use cadence_core::reorder::CooldownState;

use super::{
    build_customer_aggregates, build_order_histories, build_product_aggregates,
    build_product_demand, build_spend_history, build_top_products, AnalyticsRepository,
    CustomerRow, OrderRow, RepositoryError, SaleRow, COMPLETED_STATUS, QUALIFYING_STATUSES,
};

#[derive(Clone, Debug)]
struct StoredOrder {
    id: i64,
    customer_id: i64,
    status: String,
    total_amount: Decimal,
    created_at: NaiveDate,
}

#[derive(Clone, Debug)]
struct StoredItem {
    order_id: i64,
    product_id: i64,
    product_name: String,
    quantity: i64,
    unit_price: Decimal,
}

#[derive(Default)]
pub struct InMemoryAnalyticsRepository {
    customers: Vec<CustomerRow>,
    orders: Vec<StoredOrder>,
    items: Vec<StoredItem>,
    ledger: Mutex<CooldownState>,
}

impl InMemoryAnalyticsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&mut self, id: i64, first_name: &str, phone: Option<&str>) {
        self.customers.push(CustomerRow {
            id,
            first_name: first_name.to_string(),
            last_name: String::new(),
            phone: phone.map(str::to_string),
        });
    }

    pub fn add_order(
        &mut self,
        id: i64,
        customer_id: i64,
        status: &str,
        total_amount: Decimal,
        created_at: NaiveDate,
    ) {
        self.orders.push(StoredOrder {
            id,
            customer_id,
            status: status.to_string(),
            total_amount,
            created_at,
        });
    }

    pub fn add_item(
        &mut self,
        order_id: i64,
        product_id: i64,
        product_name: &str,
        quantity: i64,
        unit_price: Decimal,
    ) {
        self.items.push(StoredItem {
            order_id,
            product_id,
            product_name: product_name.to_string(),
            quantity,
            unit_price,
        });
    }

    fn qualifying_orders(&self) -> Vec<OrderRow> {
        self.orders
            .iter()
            .filter(|o| QUALIFYING_STATUSES.contains(&o.status.as_str()))
            .map(|o| OrderRow {
                customer_id: o.customer_id,
                total_amount: o.total_amount,
                created_at: o.created_at,
            })
            .collect()
    }

    fn sales(&self, customer_id: Option<CustomerId>, statuses: &[&str]) -> Vec<SaleRow> {
        let orders: HashMap<i64, &StoredOrder> = self
            .orders
            .iter()
            .filter(|o| statuses.contains(&o.status.as_str()))
            .filter(|o| customer_id.map_or(true, |id| id.0 == o.customer_id))
            .map(|o| (o.id, o))
            .collect();

        self.items
            .iter()
            .filter_map(|item| {
                let order = orders.get(&item.order_id)?;
                Some(SaleRow {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    order_date: order.created_at,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AnalyticsRepository for InMemoryAnalyticsRepository {
    async fn customer_aggregates(&self) -> Result<Vec<CustomerAggregate>, RepositoryError> {
        Ok(build_customer_aggregates(&self.customers, &self.qualifying_orders()))
    }

    async fn order_histories(
        &self,
    ) -> Result<HashMap<CustomerId, OrderHistory>, RepositoryError> {
        Ok(build_order_histories(&self.qualifying_orders()))
    }

    async fn product_aggregates(&self) -> Result<Vec<ProductAggregate>, RepositoryError> {
        Ok(build_product_aggregates(&self.sales(None, QUALIFYING_STATUSES)))
    }

    async fn product_demand(
        &self,
    ) -> Result<Vec<(ProductId, Vec<DemandPoint>)>, RepositoryError> {
        Ok(build_product_demand(&self.sales(None, QUALIFYING_STATUSES)))
    }

    async fn customer_spend_history(
        &self,
    ) -> Result<Vec<(CustomerId, Vec<DemandPoint>)>, RepositoryError> {
        Ok(build_spend_history(&self.qualifying_orders()))
    }

    async fn top_products_for_customer(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> Result<Vec<ProductQuantity>, RepositoryError> {
        Ok(build_top_products(&self.sales(Some(customer_id), &[COMPLETED_STATUS]), limit))
    }

    async fn load_reminder_ledger(&self) -> Result<CooldownState, RepositoryError> {
        let ledger = self
            .ledger
            .lock()
            .map_err(|_| RepositoryError::Decode("reminder ledger lock poisoned".to_string()))?;
        Ok(ledger.clone())
    }

    async fn save_reminder_ledger(
        &self,
        state: &CooldownState,
    ) -> Result<(), RepositoryError> {
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_| RepositoryError::Decode("reminder ledger lock poisoned".to_string()))?;
        *ledger = state.clone();
        Ok(())
    }
}
