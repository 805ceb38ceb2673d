use crate::models::PasteRecord;
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use moka::notification::RemovalCause;
use moka::Expiry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest eviction hint handed to the cache. Records with a later deadline
/// get no cache-side expiry and are left to the sweeper, since `Instant`
/// arithmetic may overflow past this.
const MAX_EVICTION_HINT: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Key under which a paste is stored.
pub fn storage_key(id: &str) -> String {
    format!("paste:{id}")
}

/// Evicts entries once their `storage_expires_at` hint has passed. Updates
/// (view increments) keep the original deadline.
struct StorageHintExpiry;

impl Expiry<String, PasteRecord> for StorageHintExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &PasteRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        let expires_at = value.storage_expires_at?;
        let remaining_ms = expires_at.saturating_sub(chrono::Utc::now().timestamp_millis());
        let hint = Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(0));
        (hint <= MAX_EVICTION_HINT).then_some(hint)
    }
}

/// Process-local key-value store. Each key is updated through moka's
/// per-key compute, so increments on the same paste are serialized.
///
/// The cache is unbounded: a record only leaves through `delete`, the purge
/// pass or its storage hint. `max_entries` is enforced on insert instead,
/// with a slot counter that the eviction listener gives back.
pub struct MemoryStorage {
    cache: Cache<String, PasteRecord>,
    slots: Arc<AtomicU64>,
    max_entries: u64,
}

impl MemoryStorage {
    pub fn new(max_entries: u64) -> Self {
        let slots = Arc::new(AtomicU64::new(0));
        let released = Arc::clone(&slots);
        let cache = Cache::builder()
            .expire_after(StorageHintExpiry)
            .eviction_listener(move |_key, _value, cause| {
                if !matches!(cause, RemovalCause::Replaced) {
                    released.fetch_sub(1, Ordering::AcqRel);
                }
            })
            .build();

        Self {
            cache,
            slots,
            max_entries,
        }
    }

    fn try_reserve(&self) -> bool {
        self.slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.max_entries).then_some(used + 1)
            })
            .is_ok()
    }

    /// Expired entries only give their slot back once the cache has run its
    /// housekeeping, so a full store is settled before refusing.
    async fn reserve_slot(&self) -> bool {
        if self.try_reserve() {
            return true;
        }
        self.cache.run_pending_tasks().await;
        self.try_reserve()
    }

    async fn bump_views(&self, id: &str, respect_limit: bool) -> Option<i64> {
        let result = self
            .cache
            .entry(storage_key(id))
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(entry) => {
                        let mut record = entry.into_value();
                        let at_limit = matches!(record.max_views, Some(max) if record.views >= max);
                        if respect_limit && at_limit {
                            Op::Nop
                        } else {
                            record.views += 1;
                            Op::Put(record)
                        }
                    }
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::ReplacedWith(entry) => Some(entry.value().views),
            _ => None,
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, record: &PasteRecord) -> StorageResult<()> {
        if !self.reserve_slot().await {
            return Err(StorageError::CapacityExceeded(self.max_entries));
        }

        let entry = self
            .cache
            .entry(storage_key(&record.id))
            .or_insert(record.clone())
            .await;

        if !entry.is_fresh() {
            self.slots.fetch_sub(1, Ordering::AcqRel);
            return Err(StorageError::Conflict);
        }

        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<PasteRecord>> {
        Ok(self.cache.get(&storage_key(id)).await)
    }

    async fn increment_views(&self, id: &str) -> StorageResult<Option<i64>> {
        Ok(self.bump_views(id, false).await)
    }

    async fn increment_views_within_limit(&self, id: &str) -> StorageResult<Option<i64>> {
        Ok(self.bump_views(id, true).await)
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        Ok(self.cache.remove(&storage_key(id)).await.is_some())
    }

    async fn purge_expired(&self, now_ms: i64) -> StorageResult<u64> {
        let expired: Vec<_> = self
            .cache
            .iter()
            .filter(|(_, record)| matches!(record.storage_expires_at, Some(at) if at <= now_ms))
            .map(|(key, _)| key)
            .collect();

        let mut purged = 0;
        for key in expired {
            if self.cache.remove(&*key).await.is_some() {
                purged += 1;
            }
        }
        self.cache.run_pending_tasks().await;

        Ok(purged)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, max_views: Option<i64>) -> PasteRecord {
        PasteRecord {
            id: id.to_string(),
            content: "hello".to_string(),
            created_at: 0,
            ttl_seconds: None,
            max_views,
            views: 0,
            storage_expires_at: None,
        }
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(storage_key("abcd1234"), "paste:abcd1234");
    }

    #[tokio::test]
    async fn insert_never_overwrites() {
        let storage = MemoryStorage::new(100);
        storage.insert(&record("dup", None)).await.unwrap();

        let mut other = record("dup", None);
        other.content = "other".to_string();
        assert!(matches!(
            storage.insert(&other).await,
            Err(StorageError::Conflict)
        ));
        assert_eq!(storage.get("dup").await.unwrap().unwrap().content, "hello");
    }

    #[tokio::test]
    async fn conflicting_insert_does_not_use_up_a_slot() {
        let storage = MemoryStorage::new(2);
        storage.insert(&record("a", None)).await.unwrap();
        for _ in 0..5 {
            assert!(matches!(
                storage.insert(&record("a", None)).await,
                Err(StorageError::Conflict)
            ));
        }
        storage.insert(&record("b", None)).await.unwrap();
    }

    #[tokio::test]
    async fn limited_increment_stops_at_max() {
        let storage = MemoryStorage::new(100);
        storage.insert(&record("lim", Some(2))).await.unwrap();

        assert_eq!(storage.increment_views_within_limit("lim").await.unwrap(), Some(1));
        assert_eq!(storage.increment_views_within_limit("lim").await.unwrap(), Some(2));
        assert_eq!(storage.increment_views_within_limit("lim").await.unwrap(), None);
        // The unguarded primitive keeps counting.
        assert_eq!(storage.increment_views("lim").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn full_store_refuses_inserts_and_keeps_existing_pastes() {
        let storage = MemoryStorage::new(10);
        let mut accepted = vec![];
        for i in 0..50 {
            let id = format!("p{i}");
            match storage.insert(&record(&id, None)).await {
                Ok(()) => accepted.push(id),
                Err(StorageError::CapacityExceeded(10)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        storage.close().await;

        assert_eq!(accepted.len(), 10);
        for id in &accepted {
            assert!(storage.get(id).await.unwrap().is_some(), "{id} was dropped");
        }
        assert!(matches!(
            storage.insert(&record("late", None)).await,
            Err(StorageError::CapacityExceeded(10))
        ));

        // Freed slots become usable again.
        for id in &accepted {
            storage.delete(id).await.unwrap();
        }
        storage.insert(&record("late", None)).await.unwrap();
        assert!(storage.get("late").await.unwrap().is_some());
    }

    #[test]
    fn hint_is_skipped_beyond_the_cache_horizon() {
        let now = chrono::Utc::now().timestamp_millis();
        let key = storage_key("far");

        let mut soon = record("soon", None);
        soon.storage_expires_at = Some(now + 60_000);
        let hint = StorageHintExpiry.expire_after_create(&key, &soon, Instant::now());
        assert!(matches!(hint, Some(d) if d <= Duration::from_secs(60)));

        let mut far = record("far", None);
        far.storage_expires_at = Some(now + 20 * 365 * 24 * 60 * 60 * 1000);
        assert_eq!(
            StorageHintExpiry.expire_after_create(&key, &far, Instant::now()),
            None
        );

        assert_eq!(
            StorageHintExpiry.expire_after_create(&key, &record("never", None), Instant::now()),
            None
        );
    }

    #[tokio::test]
    async fn increment_on_missing_key_does_not_create_it() {
        let storage = MemoryStorage::new(100);
        assert_eq!(storage.increment_views("ghost").await.unwrap(), None);
        assert!(storage.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_passed_hints() {
        let storage = MemoryStorage::new(100);
        let now = chrono::Utc::now().timestamp_millis();

        let mut stale = record("stale", None);
        stale.storage_expires_at = Some(now - 1);
        let mut fresh = record("fresh", None);
        fresh.storage_expires_at = Some(now + 60_000);
        storage.insert(&stale).await.unwrap();
        storage.insert(&fresh).await.unwrap();
        storage.insert(&record("forever", None)).await.unwrap();

        // The stale entry may already have been evicted by the cache itself.
        let purged = storage.purge_expired(now).await.unwrap();
        assert!(purged <= 1);
        assert!(storage.get("stale").await.unwrap().is_none());
        assert!(storage.get("fresh").await.unwrap().is_some());
        assert!(storage.get("forever").await.unwrap().is_some());
    }
}
