use std::time::Duration;

use cadence_core::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Open a pool against the configured SQLite database. Every connection gets
/// foreign keys, WAL, and a busy timeout before it is handed out.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    pool_options(config.max_connections, config.timeout_secs).connect(&config.url).await
}

/// Private in-memory database, migrated by the caller. Test surface.
pub async fn connect_memory() -> Result<DbPool, sqlx::Error> {
    pool_options(1, 5).connect("sqlite::memory:").await
}

fn pool_options(max_connections: u32, timeout_secs: u64) -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
}
