use crate::models::PasteRecord;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("paste id already exists")]
    Conflict,
    #[error("storage is full ({0} entries)")]
    CapacityExceeded(u64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Other(err.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;

    /// Insert a new record. Fails with [`StorageError::Conflict`] if the id
    /// is already taken; never overwrites. Bounded backends refuse new
    /// records with [`StorageError::CapacityExceeded`] instead of evicting.
    async fn insert(&self, record: &PasteRecord) -> StorageResult<()>;

    /// Get a paste by id
    async fn get(&self, id: &str) -> StorageResult<Option<PasteRecord>>;

    /// Atomically add one view and return the new count, or `None` if the
    /// paste does not exist.
    async fn increment_views(&self, id: &str) -> StorageResult<Option<i64>>;

    /// Like [`Storage::increment_views`], but only while `views < max_views`.
    /// Returns `None` when the paste is missing or already at its limit.
    async fn increment_views_within_limit(&self, id: &str) -> StorageResult<Option<i64>>;

    /// Remove a paste. Returns whether a record was removed; removing a
    /// missing id is not an error.
    async fn delete(&self, id: &str) -> StorageResult<bool>;

    /// Remove every record whose storage expiry hint is at or before `now_ms`.
    async fn purge_expired(&self, now_ms: i64) -> StorageResult<u64>;

    /// Cheap reachability check used by the health endpoint.
    async fn ping(&self) -> StorageResult<()>;

    /// Release connections. Called once on shutdown.
    async fn close(&self);
}
