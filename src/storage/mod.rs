pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod sweeper;
pub mod trait_def;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use sweeper::ExpirySweeper;
pub use trait_def::{Storage, StorageError, StorageResult};

use crate::config::{StorageBackend, StorageConfig};
use std::sync::Arc;
use tracing::info;

/// Build and initialize the configured backend.
pub async fn connect(config: &StorageConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::Memory => {
            info!(
                "Using in-memory storage (max {} entries)",
                config.memory_max_entries
            );
            Arc::new(MemoryStorage::new(config.memory_max_entries))
        }
        StorageBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStorage::new(&config.url, config.max_connections).await?)
        }
        StorageBackend::Postgres => {
            info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(&config.url, config.max_connections).await?)
        }
    };

    storage.init().await?;
    Ok(storage)
}
