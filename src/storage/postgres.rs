use crate::models::PasteRecord;
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pastes (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                created_at BIGINT NOT NULL,
                ttl_seconds BIGINT,
                max_views BIGINT,
                views BIGINT NOT NULL DEFAULT 0,
                storage_expires_at BIGINT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pastes_storage_expires_at ON pastes(storage_expires_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn insert(&self, record: &PasteRecord) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO pastes (id, content, created_at, ttl_seconds, max_views, views, storage_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.content)
        .bind(record.created_at)
        .bind(record.ttl_seconds)
        .bind(record.max_views)
        .bind(record.views)
        .bind(record.storage_expires_at)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<PasteRecord>> {
        let record = sqlx::query_as::<_, PasteRecord>(
            r#"
            SELECT id, content, created_at, ttl_seconds, max_views, views, storage_expires_at
            FROM pastes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn increment_views(&self, id: &str) -> StorageResult<Option<i64>> {
        let views = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE pastes
            SET views = views + 1
            WHERE id = $1
            RETURNING views
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(views)
    }

    async fn increment_views_within_limit(&self, id: &str) -> StorageResult<Option<i64>> {
        let views = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE pastes
            SET views = views + 1
            WHERE id = $1 AND (max_views IS NULL OR views < max_views)
            RETURNING views
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(views)
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM pastes WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now_ms: i64) -> StorageResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM pastes
            WHERE storage_expires_at IS NOT NULL AND storage_expires_at <= $1
            "#,
        )
        .bind(now_ms)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
