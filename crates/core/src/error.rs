//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid descriptor {raw:?}: {reason}")]
    InvalidDescriptor { raw: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid_descriptor(raw: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
