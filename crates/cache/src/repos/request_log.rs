//! Request log repository.

use crate::error::CacheResult;
use crate::models::RequestLogRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Append-only log of inbound requests.
#[async_trait]
pub trait RequestLogRepo: Send + Sync {
    async fn append_request(&self, row: &RequestLogRow) -> CacheResult<()>;

    /// Delete records older than `cutoff`. Returns the number removed.
    async fn delete_requests_before(&self, cutoff: OffsetDateTime) -> CacheResult<u64>;

    async fn count_requests(&self) -> CacheResult<u64>;
}
