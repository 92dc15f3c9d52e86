//! Upstream error taxonomy.
//!
//! Retry policy dispatches on these variants, never on message text.

use std::time::Duration;
use thiserror::Error;

/// Upstream operation errors.
///
/// `Clone` so a single login outcome can be handed to every caller that
/// waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The session token was refused. A fresh login may fix this.
    #[error("session credential rejected: {0}")]
    AuthRejected(String),

    #[error("login failed: {0}")]
    LoginFailed(String),

    #[error("file not found upstream: {0}")]
    NotFound(String),

    #[error("download quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("transient upstream failure: {0}")]
    Transient(String),

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    /// A well-formed refusal with a code none of the configured lists name.
    #[error("upstream refused request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl UpstreamError {
    /// Failures that may clear up on their own; the caller may try again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Result type for upstream operations.
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;
