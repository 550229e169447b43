use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use cadence_core::domain::customer::{
    CustomerAggregate, CustomerId, OrderHistory, ProductQuantity,
};
use cadence_core::domain::product::{DemandPoint, ProductAggregate, ProductId};
use cadence_core::reorder::CooldownState;

use super::{
    build_customer_aggregates, build_order_histories, build_product_aggregates,
    build_product_demand, build_spend_history, build_top_products, parse_amount,
    AnalyticsRepository, CustomerRow, OrderRow, RepositoryError, SaleRow, COMPLETED_STATUS,
    QUALIFYING_STATUSES,
};
use crate::DbPool;

pub struct SqlAnalyticsRepository {
    pool: DbPool,
}

impl SqlAnalyticsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_customers(&self) -> Result<Vec<CustomerRow>, RepositoryError> {
        let rows =
            sqlx::query("SELECT id, first_name, last_name, phone FROM customers ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|row| CustomerRow {
                id: row.get("id"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                phone: row.get("phone"),
            })
            .collect())
    }

    async fn fetch_qualifying_orders(&self) -> Result<Vec<OrderRow>, RepositoryError> {
        let sql = format!(
            "SELECT customer_id, total_amount, created_at FROM orders WHERE status IN ({})",
            status_list(QUALIFYING_STATUSES)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                Ok(OrderRow {
                    customer_id: row.get("customer_id"),
                    total_amount: parse_amount(
                        &row.get::<String, _>("total_amount"),
                        "orders.total_amount",
                    )?,
                    created_at: parse_date(
                        &row.get::<String, _>("created_at"),
                        "orders.created_at",
                    )?,
                })
            })
            .collect()
    }

    async fn fetch_sales(
        &self,
        customer_id: Option<CustomerId>,
        statuses: &[&str],
    ) -> Result<Vec<SaleRow>, RepositoryError> {
        let mut sql = format!(
            "SELECT oi.product_id, p.name AS product_name, o.created_at, oi.quantity, oi.unit_price \
             FROM order_items oi \
             JOIN orders o ON o.id = oi.order_id \
             JOIN products p ON p.id = oi.product_id \
             WHERE o.status IN ({})",
            status_list(statuses)
        );
        if customer_id.is_some() {
            sql.push_str(" AND o.customer_id = ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(id) = customer_id {
            query = query.bind(id.0);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                Ok(SaleRow {
                    product_id: row.get("product_id"),
                    product_name: row.get("product_name"),
                    order_date: parse_date(
                        &row.get::<String, _>("created_at"),
                        "orders.created_at",
                    )?,
                    quantity: row.get("quantity"),
                    unit_price: parse_amount(
                        &row.get::<String, _>("unit_price"),
                        "order_items.unit_price",
                    )?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AnalyticsRepository for SqlAnalyticsRepository {
    async fn customer_aggregates(&self) -> Result<Vec<CustomerAggregate>, RepositoryError> {
        let customers = self.fetch_customers().await?;
        let orders = self.fetch_qualifying_orders().await?;
        Ok(build_customer_aggregates(&customers, &orders))
    }

    async fn order_histories(
        &self,
    ) -> Result<HashMap<CustomerId, OrderHistory>, RepositoryError> {
        Ok(build_order_histories(&self.fetch_qualifying_orders().await?))
    }

    async fn product_aggregates(&self) -> Result<Vec<ProductAggregate>, RepositoryError> {
        Ok(build_product_aggregates(&self.fetch_sales(None, QUALIFYING_STATUSES).await?))
    }

    async fn product_demand(
        &self,
    ) -> Result<Vec<(ProductId, Vec<DemandPoint>)>, RepositoryError> {
        Ok(build_product_demand(&self.fetch_sales(None, QUALIFYING_STATUSES).await?))
    }

    async fn customer_spend_history(
        &self,
    ) -> Result<Vec<(CustomerId, Vec<DemandPoint>)>, RepositoryError> {
        Ok(build_spend_history(&self.fetch_qualifying_orders().await?))
    }

    async fn top_products_for_customer(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> Result<Vec<ProductQuantity>, RepositoryError> {
        let sales = self.fetch_sales(Some(customer_id), &[COMPLETED_STATUS]).await?;
        Ok(build_top_products(&sales, limit))
    }

    async fn load_reminder_ledger(&self) -> Result<CooldownState, RepositoryError> {
        let rows = sqlx::query("SELECT customer_id, last_contacted FROM reminder_ledger")
            .fetch_all(&self.pool)
            .await?;

        let mut state = CooldownState::default();
        for row in rows {
            let customer_id: i64 = row.get("customer_id");
            let last = parse_date(
                &row.get::<String, _>("last_contacted"),
                "reminder_ledger.last_contacted",
            )?;
            state.last_contacted.insert(customer_id, last);
        }
        Ok(state)
    }

    async fn save_reminder_ledger(
        &self,
        state: &CooldownState,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM reminder_ledger").execute(&mut *tx).await?;
        for (customer_id, last_contacted) in &state.last_contacted {
            sqlx::query("INSERT INTO reminder_ledger (customer_id, last_contacted) VALUES (?, ?)")
                .bind(customer_id)
                .bind(last_contacted.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn status_list(statuses: &[&str]) -> String {
    statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(", ")
}

fn parse_date(raw: &str, context: &str) -> Result<NaiveDate, RepositoryError> {
    // Stored as ISO text; datetime values keep their date prefix.
    let prefix = raw.get(..10).unwrap_or(raw);
    prefix
        .parse()
        .map_err(|err| RepositoryError::Decode(format!("{context}: bad date `{raw}`: {err}")))
}
