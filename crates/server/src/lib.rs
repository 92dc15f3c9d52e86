//! HTTP redirect service for direct download links.
//!
//! This crate provides the request path and its background work:
//! - Descriptor redirect endpoint (GET/HEAD)
//! - Cache-first resolution with a single auth retry
//! - Health, status and Prometheus endpoints
//! - Eviction timers and the request log writer

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod request_log;
pub mod resolver;
pub mod routes;
pub mod scheduler;
pub mod state;

pub use error::ApiError;
pub use request_log::RequestLogger;
pub use resolver::{Resolution, ResolutionSource, Resolver};
pub use routes::create_router;
pub use scheduler::EvictionScheduler;
pub use state::AppState;
