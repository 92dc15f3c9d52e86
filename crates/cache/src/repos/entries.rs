//! Resolution cache entry repository.

use crate::error::CacheResult;
use crate::models::CacheEntry;
use async_trait::async_trait;
use strmlink_core::CacheKey;
use time::OffsetDateTime;

/// Repository for resolved download URLs.
///
/// Time is passed in rather than read, so callers decide which clock applies.
#[async_trait]
pub trait EntryRepo: Send + Sync {
    /// Get the entry for `key` unless it has expired at `now`.
    async fn get_entry(&self, key: &CacheKey, now: OffsetDateTime)
    -> CacheResult<Option<CacheEntry>>;

    /// Insert an entry, replacing any existing one for the same key.
    async fn upsert_entry(&self, entry: &CacheEntry) -> CacheResult<()>;

    /// Delete entries with `expires_at <= now`. Returns the number removed.
    async fn delete_expired_entries(&self, now: OffsetDateTime) -> CacheResult<u64>;

    /// Delete the `limit` entries with the oldest `created_at`.
    async fn delete_oldest_entries(&self, limit: u64) -> CacheResult<u64>;

    /// Count stored entries, expired-but-unswept included.
    async fn count_entries(&self) -> CacheResult<u64>;
}
