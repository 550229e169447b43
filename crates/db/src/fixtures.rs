//! Deterministic demo dataset for the `seed` command and integration tests.

use serde::Serialize;
use sqlx::Executor;
use sqlx::Row;

use crate::repositories::RepositoryError;
use crate::DbPool;

/// Row counts the canonical dataset is expected to produce.
const EXPECTED_CUSTOMERS: i64 = 8;
const EXPECTED_PRODUCTS: i64 = 4;
const EXPECTED_ORDERS: i64 = 37;
const EXPECTED_ORDER_ITEMS: i64 = 30;

pub struct SeedDataset;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub customers: i64,
    pub products: i64,
    pub orders: i64,
    pub order_items: i64,
}

impl SeedDataset {
    pub const SQL: &'static str = include_str!("../fixtures/seed_data.sql");

    /// Load the dataset into an empty, migrated database.
    pub async fn load(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
        let mut tx = pool.begin().await?;
        // Raw string execution runs every statement in the script.
        tx.execute(Self::SQL).await?;
        tx.commit().await?;
        Self::verify(pool).await
    }

    /// Count the seeded rows and check them against the dataset contract.
    pub async fn verify(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
        let summary = SeedSummary {
            customers: count(pool, "customers").await?,
            products: count(pool, "products").await?,
            orders: count(pool, "orders").await?,
            order_items: count(pool, "order_items").await?,
        };

        let expected = SeedSummary {
            customers: EXPECTED_CUSTOMERS,
            products: EXPECTED_PRODUCTS,
            orders: EXPECTED_ORDERS,
            order_items: EXPECTED_ORDER_ITEMS,
        };
        if summary != expected {
            return Err(RepositoryError::Decode(format!(
                "seed dataset mismatch: expected {expected:?}, found {summary:?}"
            )));
        }
        Ok(summary)
    }
}

async fn count(pool: &DbPool, table: &str) -> Result<i64, RepositoryError> {
    let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}")).fetch_one(pool).await?;
    Ok(row.get("n"))
}
