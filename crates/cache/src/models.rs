//! Records held by the cache store.

use crate::error::{CacheError, CacheResult};
use sqlx::FromRow;
use strmlink_core::CacheKey;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

// =============================================================================
// Resolution cache
// =============================================================================

/// A resolved download URL and its validity window.
///
/// `expires_at` is fixed at creation. Entries are replaced, never extended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub redirect_url: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl CacheEntry {
    /// Create an entry valid for `ttl` from `now`.
    ///
    /// Timestamps are truncated to milliseconds, the precision the SQLite
    /// backend stores. A `ttl` past the end of the date range saturates.
    pub fn new(key: CacheKey, redirect_url: impl Into<String>, now: OffsetDateTime, ttl: Duration) -> Self {
        let created_at = truncate_to_millis(now);
        let expires_at = created_at
            .checked_add(ttl)
            .unwrap_or_else(|| truncate_to_millis(PrimitiveDateTime::MAX.assume_utc()));
        Self {
            key,
            redirect_url: redirect_url.into(),
            created_at,
            expires_at,
        }
    }

    /// Whether the entry is logically absent at `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Row shape of `resolution_cache`.
#[derive(Debug, Clone, FromRow)]
pub struct CacheEntryRow {
    pub fingerprint: String,
    pub storage_key: String,
    pub redirect_url: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl TryFrom<CacheEntryRow> for CacheEntry {
    type Error = CacheError;

    fn try_from(row: CacheEntryRow) -> CacheResult<Self> {
        Ok(Self {
            key: CacheKey::new(row.fingerprint, row.storage_key),
            redirect_url: row.redirect_url,
            created_at: from_millis(row.created_at)?,
            expires_at: from_millis(row.expires_at)?,
        })
    }
}

// =============================================================================
// Request log
// =============================================================================

/// One inbound request, recorded for observability only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLogRow {
    pub requested_at: OffsetDateTime,
    pub method: String,
    /// Raw descriptor as received, query included.
    pub descriptor: String,
    /// Outcome class, e.g. `cache_hit`, `upstream`, `invalid_descriptor`.
    pub outcome: String,
    pub status: u16,
    pub latency_ms: u64,
}

// =============================================================================
// Timestamp encoding
// =============================================================================

pub(crate) fn to_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_millis(ms: i64) -> CacheResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .map_err(|e| CacheError::Corrupt(format!("timestamp {ms}: {e}")))
}

fn truncate_to_millis(t: OffsetDateTime) -> OffsetDateTime {
    let nanos = t.nanosecond();
    t - Duration::nanoseconds(i64::from(nanos % 1_000_000))
}
