//! TTL policy over a [`ResolutionStore`].

use crate::error::CacheResult;
use crate::models::CacheEntry;
use crate::repos::EntryRepo;
use crate::store::ResolutionStore;
use std::sync::Arc;
use strmlink_core::{CacheKey, Clock};
use time::Duration;

/// Maps cache keys to resolved download URLs with a fixed per-entry TTL.
///
/// Expired entries are invisible to [`lookup`](Self::lookup) whether or not a
/// sweep has removed them yet.
#[derive(Clone)]
pub struct ResolutionCache {
    store: Arc<dyn ResolutionStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResolutionCache {
    pub fn new(store: Arc<dyn ResolutionStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        self.store.get_entry(key, self.clock.now()).await
    }

    /// Insert or replace the entry for `key`, valid for one TTL from now.
    pub async fn put(&self, key: &CacheKey, url: &str) -> CacheResult<CacheEntry> {
        let entry = CacheEntry::new(key.clone(), url, self.clock.now(), self.ttl);
        self.store.upsert_entry(&entry).await?;
        Ok(entry)
    }

    /// Physically remove every entry that has expired.
    pub async fn sweep_expired(&self) -> CacheResult<u64> {
        self.store.delete_expired_entries(self.clock.now()).await
    }

    /// Remove the `n` oldest entries.
    pub async fn evict_oldest(&self, n: u64) -> CacheResult<u64> {
        self.store.delete_oldest_entries(n).await
    }

    /// Trim oldest-first until at most `max_entries` remain.
    pub async fn enforce_capacity(&self, max_entries: u64) -> CacheResult<u64> {
        let count = self.store.count_entries().await?;
        if count <= max_entries {
            return Ok(0);
        }
        self.evict_oldest(count - max_entries).await
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> CacheResult<u64> {
        self.store.count_entries().await
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
