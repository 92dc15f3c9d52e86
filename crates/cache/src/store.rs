//! Cache store trait and the SQLite implementation.

use crate::error::CacheResult;
use crate::models::{CacheEntry, CacheEntryRow, RequestLogRow, to_millis};
use crate::repos::{EntryRepo, RequestLogRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use strmlink_core::CacheKey;
use time::OffsetDateTime;

/// Combined cache store trait.
#[async_trait]
pub trait ResolutionStore: EntryRepo + RequestLogRepo + Send + Sync {
    /// Create tables and indexes if missing.
    async fn migrate(&self) -> CacheResult<()>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> CacheResult<()>;

    /// Short backend name for status reporting.
    fn backend(&self) -> &'static str;
}

/// SQLite-based cache store. Survives restarts.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and migrate it.
    pub async fn new(path: impl AsRef<Path>, query_timeout_secs: Option<u64>) -> CacheResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // A single writer connection; statements are short and rows independent.
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(query_timeout_secs.unwrap_or(30)))
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "opened sqlite cache store");
        Ok(store)
    }
}

#[async_trait]
impl ResolutionStore for SqliteStore {
    async fn migrate(&self) -> CacheResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[async_trait]
impl EntryRepo for SqliteStore {
    async fn get_entry(
        &self,
        key: &CacheKey,
        now: OffsetDateTime,
    ) -> CacheResult<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, CacheEntryRow>(
            r#"
            SELECT fingerprint, storage_key, redirect_url, created_at, expires_at
            FROM resolution_cache
            WHERE fingerprint = ? AND storage_key = ? AND expires_at > ?
            "#,
        )
        .bind(&key.fingerprint)
        .bind(&key.storage_key)
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await?;

        row.map(CacheEntry::try_from).transpose()
    }

    async fn upsert_entry(&self, entry: &CacheEntry) -> CacheResult<()> {
        sqlx::query(
            r#"
            INSERT INTO resolution_cache (
                fingerprint, storage_key, redirect_url, created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (fingerprint, storage_key) DO UPDATE SET
                redirect_url = excluded.redirect_url,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&entry.key.fingerprint)
        .bind(&entry.key.storage_key)
        .bind(&entry.redirect_url)
        .bind(to_millis(entry.created_at))
        .bind(to_millis(entry.expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_expired_entries(&self, now: OffsetDateTime) -> CacheResult<u64> {
        let result = sqlx::query("DELETE FROM resolution_cache WHERE expires_at <= ?")
            .bind(to_millis(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_oldest_entries(&self, limit: u64) -> CacheResult<u64> {
        if limit == 0 {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            DELETE FROM resolution_cache WHERE rowid IN (
                SELECT rowid FROM resolution_cache ORDER BY created_at ASC LIMIT ?
            )
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_entries(&self) -> CacheResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resolution_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl RequestLogRepo for SqliteStore {
    async fn append_request(&self, row: &RequestLogRow) -> CacheResult<()> {
        sqlx::query(
            r#"
            INSERT INTO request_log (
                requested_at, method, descriptor, outcome, status, latency_ms
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_millis(row.requested_at))
        .bind(&row.method)
        .bind(&row.descriptor)
        .bind(&row.outcome)
        .bind(i64::from(row.status))
        .bind(i64::try_from(row.latency_ms).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_requests_before(&self, cutoff: OffsetDateTime) -> CacheResult<u64> {
        let result = sqlx::query("DELETE FROM request_log WHERE requested_at < ?")
            .bind(to_millis(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_requests(&self) -> CacheResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM request_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

/// SQL schema for SQLite. Timestamps are unix milliseconds.
const SCHEMA_SQL: &str = r#"
-- Resolved download URLs
CREATE TABLE IF NOT EXISTS resolution_cache (
    fingerprint TEXT NOT NULL,
    storage_key TEXT NOT NULL DEFAULT '',
    redirect_url TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    PRIMARY KEY (fingerprint, storage_key),
    CHECK (expires_at > created_at)
);
CREATE INDEX IF NOT EXISTS idx_resolution_cache_expires ON resolution_cache(expires_at);
CREATE INDEX IF NOT EXISTS idx_resolution_cache_created ON resolution_cache(created_at);

-- Inbound request log
CREATE TABLE IF NOT EXISTS request_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    requested_at INTEGER NOT NULL,
    method TEXT NOT NULL,
    descriptor TEXT NOT NULL,
    outcome TEXT NOT NULL,
    status INTEGER NOT NULL,
    latency_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_request_log_requested ON request_log(requested_at);
"#;
