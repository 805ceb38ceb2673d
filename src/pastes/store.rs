use std::sync::Arc;

use crate::clock;
use crate::lifecycle::{self, PasteState};
use crate::models::{NewPaste, PasteRecord};
use crate::pastes::id::{generate_id, is_well_formed};
use crate::pastes::{NotFoundReason, PasteError, PasteResult};
use crate::storage::{Storage, StorageError};

/// How many fresh ids to try before giving up on an insert that keeps
/// colliding.
const MAX_ID_ATTEMPTS: usize = 5;

/// A paste that passed the availability check and had its view counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPaste {
    pub id: String,
    pub content: String,
    /// View count after this read.
    pub views: i64,
    pub remaining_views: Option<i64>,
    /// Epoch milliseconds.
    pub expires_at: Option<i64>,
}

/// Paste operations on top of a storage backend.
pub struct PasteStore {
    storage: Arc<dyn Storage>,
    strict_view_limit: bool,
}

impl PasteStore {
    pub fn new(storage: Arc<dyn Storage>, strict_view_limit: bool) -> Self {
        Self {
            storage,
            strict_view_limit,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Store a new paste created at `now_ms` and return the record.
    pub async fn create(&self, paste: NewPaste, now_ms: i64) -> PasteResult<PasteRecord> {
        // The eviction hint follows the wall clock even when the request
        // clock is overridden.
        let storage_expires_at = paste
            .ttl_seconds()
            .map(|ttl| clock::now_ms().saturating_add(ttl.saturating_mul(1000)));

        let mut record = PasteRecord {
            id: generate_id(),
            content: paste.content().to_string(),
            created_at: now_ms,
            ttl_seconds: paste.ttl_seconds(),
            max_views: paste.max_views(),
            views: 0,
            storage_expires_at,
        };

        for attempt in 1..=MAX_ID_ATTEMPTS {
            match self.storage.insert(&record).await {
                Ok(()) => {
                    tracing::info!(
                        paste_id = %record.id,
                        ttl_seconds = ?record.ttl_seconds,
                        max_views = ?record.max_views,
                        "Created paste"
                    );
                    return Ok(record);
                }
                Err(StorageError::Conflict) if attempt < MAX_ID_ATTEMPTS => {
                    tracing::debug!(paste_id = %record.id, "Paste id collision, regenerating");
                    record.id = generate_id();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::Conflict.into())
    }

    pub async fn get(&self, id: &str) -> PasteResult<PasteRecord> {
        self.storage
            .get(id)
            .await?
            .ok_or(PasteError::NotFound(NotFoundReason::Absent))
    }

    pub async fn increment_views(&self, id: &str) -> PasteResult<i64> {
        self.storage
            .increment_views(id)
            .await?
            .ok_or(PasteError::NotFound(NotFoundReason::Absent))
    }

    /// Idempotent; returns whether a record was removed.
    pub async fn delete(&self, id: &str) -> PasteResult<bool> {
        Ok(self.storage.delete(id).await?)
    }

    pub async fn is_healthy(&self) -> bool {
        match self.storage.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Storage health check failed: {}", e);
                false
            }
        }
    }

    /// Serve a paste at `now_ms`: count the view if it is still available,
    /// otherwise remove it and report it as not found.
    pub async fn open(&self, id: &str, now_ms: i64) -> PasteResult<OpenedPaste> {
        if !is_well_formed(id) {
            return Err(PasteError::NotFound(NotFoundReason::Absent));
        }

        let record = self.storage.get(id).await?;
        let record = match (lifecycle::evaluate(record.as_ref(), now_ms), record) {
            (PasteState::Available, Some(record)) => record,
            (PasteState::Expired, _) => return Err(self.retire(id, NotFoundReason::Expired).await),
            (PasteState::Exhausted, _) => {
                return Err(self.retire(id, NotFoundReason::Exhausted).await)
            }
            _ => return Err(not_found(id, NotFoundReason::Absent)),
        };

        let views = if self.strict_view_limit {
            self.storage.increment_views_within_limit(id).await?
        } else {
            self.storage.increment_views(id).await?
        };

        let Some(views) = views else {
            // Another reader took the last view, or the paste was removed
            // between the read and the increment.
            return Err(if self.strict_view_limit {
                self.retire(id, NotFoundReason::Exhausted).await
            } else {
                not_found(id, NotFoundReason::Absent)
            });
        };

        Ok(OpenedPaste {
            remaining_views: lifecycle::remaining_views(record.max_views, views),
            expires_at: lifecycle::expires_at_ms(&record),
            id: record.id,
            content: record.content,
            views,
        })
    }

    /// Best-effort removal of an expired or exhausted paste. A failed delete
    /// is logged; the caller still reports not found.
    async fn retire(&self, id: &str, reason: NotFoundReason) -> PasteError {
        match self.storage.delete(id).await {
            Ok(true) => tracing::info!(paste_id = %id, reason = reason.as_str(), "Deleted paste"),
            Ok(false) => {}
            Err(e) => tracing::warn!(
                paste_id = %id,
                reason = reason.as_str(),
                error = %e,
                "failed to delete paste"
            ),
        }
        not_found(id, reason)
    }
}

fn not_found(id: &str, reason: NotFoundReason) -> PasteError {
    tracing::debug!(paste_id = %id, reason = reason.as_str(), "Paste not served");
    PasteError::NotFound(reason)
}
