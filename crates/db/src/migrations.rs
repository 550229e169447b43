use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connection::connect_memory;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "customers",
        "products",
        "orders",
        "order_items",
        "reminder_ledger",
        "idx_orders_customer_id",
        "idx_orders_status",
        "idx_orders_created_at",
        "idx_order_items_order_id",
        "idx_order_items_product_id",
    ];

    #[tokio::test]
    async fn migrations_create_the_managed_schema() {
        let pool = connect_memory().await.expect("in-memory pool");
        run_pending(&pool).await.expect("migrations apply");

        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'index') AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'",
        )
        .fetch_all(&pool)
        .await
        .expect("schema listing");

        let names: Vec<String> = rows.iter().map(|row| row.get::<String, _>("name")).collect();
        for object in MANAGED_SCHEMA_OBJECTS {
            assert!(names.iter().any(|n| n == object), "missing schema object `{object}`");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_memory().await.expect("in-memory pool");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");
    }
}
