//! In-process cache store.
//!
//! Nothing survives a restart. Used by tests and by deployments that accept
//! a cold cache after every restart.

use crate::error::CacheResult;
use crate::models::{CacheEntry, RequestLogRow};
use crate::repos::{EntryRepo, RequestLogRepo};
use crate::store::ResolutionStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;
use strmlink_core::CacheKey;
use time::OffsetDateTime;

#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<CacheKey, CacheEntry>,
    requests: Mutex<Vec<RequestLogRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResolutionStore for MemoryStore {
    async fn migrate(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl EntryRepo for MemoryStore {
    async fn get_entry(
        &self,
        key: &CacheKey,
        now: OffsetDateTime,
    ) -> CacheResult<Option<CacheEntry>> {
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value().clone()))
    }

    async fn upsert_entry(&self, entry: &CacheEntry) -> CacheResult<()> {
        self.entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn delete_expired_entries(&self, now: OffsetDateTime) -> CacheResult<u64> {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn delete_oldest_entries(&self, limit: u64) -> CacheResult<u64> {
        let mut by_age: Vec<(OffsetDateTime, CacheKey)> = self
            .entries
            .iter()
            .map(|entry| (entry.created_at, entry.key().clone()))
            .collect();
        by_age.sort();

        let mut removed = 0;
        for (_, key) in by_age.into_iter().take(limit as usize) {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn count_entries(&self) -> CacheResult<u64> {
        Ok(self.entries.len() as u64)
    }
}

#[async_trait]
impl RequestLogRepo for MemoryStore {
    async fn append_request(&self, row: &RequestLogRow) -> CacheResult<()> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(row.clone());
        Ok(())
    }

    async fn delete_requests_before(&self, cutoff: OffsetDateTime) -> CacheResult<u64> {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        let before = requests.len();
        requests.retain(|row| row.requested_at >= cutoff);
        Ok((before - requests.len()) as u64)
    }

    async fn count_requests(&self) -> CacheResult<u64> {
        Ok(self.requests.lock().unwrap_or_else(|e| e.into_inner()).len() as u64)
    }
}
