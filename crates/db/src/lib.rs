pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_memory, DbPool};
pub use fixtures::{SeedDataset, SeedSummary};
pub use repositories::{
    AnalyticsRepository, InMemoryAnalyticsRepository, RepositoryError, SqlAnalyticsRepository,
};
