//! The upstream collaborator contract.

use crate::error::UpstreamResult;
use async_trait::async_trait;
use strmlink_core::{Credential, FileDescriptor};

/// An upstream storage service that issues session credentials and
/// resolves descriptors to time-limited download URLs.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Exchange the configured account credentials for a session token.
    async fn login(&self) -> UpstreamResult<Credential>;

    /// Resolve `descriptor` to a download URL using `credential`.
    ///
    /// Returns [`UpstreamError::AuthRejected`](crate::UpstreamError::AuthRejected)
    /// only when the token itself was refused.
    async fn resolve_download_url(
        &self,
        descriptor: &FileDescriptor,
        credential: &Credential,
    ) -> UpstreamResult<String>;
}
