//! Resolution cache storage for strmlink.
//!
//! This crate owns the service's persisted state:
//! - Resolved download URLs keyed by `(fingerprint, storage_key)`
//! - The optional inbound request log
//!
//! [`ResolutionCache`] applies the TTL policy on top of any
//! [`ResolutionStore`] backend.

pub mod error;
pub mod memory;
pub mod models;
pub mod repos;
pub mod resolution;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryStore;
pub use models::{CacheEntry, RequestLogRow};
pub use resolution::ResolutionCache;
pub use store::{ResolutionStore, SqliteStore};

use std::sync::Arc;
use strmlink_core::config::StoreConfig;

/// Create a cache store from configuration.
pub async fn from_config(config: &StoreConfig) -> CacheResult<Arc<dyn ResolutionStore>> {
    match config {
        StoreConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn ResolutionStore>)
        }
        StoreConfig::Memory => {
            tracing::warn!("using in-memory cache store; resolutions are lost on restart");
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn ResolutionStore>)
        }
    }
}
