//! Upstream storage API access for strmlink.
//!
//! This crate provides:
//! - The [`Upstream`] contract: login and download-URL resolution
//! - A typed error taxonomy that retry policy dispatches on
//! - [`CredentialManager`], the single owner of the session credential
//! - Backends: JSON over HTTP

pub mod backends;
pub mod error;
pub mod session;
pub mod traits;

pub use backends::http::HttpUpstream;
pub use error::{UpstreamError, UpstreamResult};
pub use session::{CredentialManager, CredentialState};
pub use traits::Upstream;

use std::sync::Arc;
use strmlink_core::config::UpstreamConfig;

/// Create an upstream client from configuration.
pub fn from_config(config: &UpstreamConfig) -> UpstreamResult<Arc<dyn Upstream>> {
    if config.passport.is_empty() || config.password.is_empty() {
        tracing::warn!("upstream passport or password is not set; logins will fail");
    }
    let backend = HttpUpstream::new(config.clone())?;
    Ok(Arc::new(backend))
}
