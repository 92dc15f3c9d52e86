//! Core domain types and shared logic for the strmlink direct-link service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - File descriptors and their path encoding
//! - Cache identity for resolved download URLs
//! - Upstream session credentials
//! - The injectable clock
//! - Application configuration

pub mod clock;
pub mod config;
pub mod credential;
pub mod descriptor;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::Credential;
pub use descriptor::{CacheKey, FileDescriptor};
pub use error::{Error, Result};

/// Default lifetime of a resolved download URL: 20 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 20 * 60 * 60;

/// Default credential refresh lead time: 5 minutes.
pub const DEFAULT_REFRESH_SKEW_SECS: u64 = 5 * 60;
