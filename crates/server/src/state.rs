//! Application state shared across handlers.

use crate::request_log::RequestLogger;
use crate::resolver::Resolver;
use std::sync::Arc;
use strmlink_cache::{ResolutionCache, ResolutionStore};
use strmlink_core::Clock;
use strmlink_core::config::AppConfig;
use strmlink_upstream::{CredentialManager, Upstream};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Time source for cache expiry and credential refresh.
    pub clock: Arc<dyn Clock>,
    /// Durable store behind the cache and request log.
    pub store: Arc<dyn ResolutionStore>,
    pub cache: ResolutionCache,
    /// The one session credential, shared by every request.
    pub credentials: Arc<CredentialManager>,
    pub resolver: Resolver,
    pub request_log: RequestLogger,
}

impl AppState {
    /// Wire the cache, credential manager and resolver together.
    ///
    /// The configuration is expected to have passed [`AppConfig::validate`].
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ResolutionStore>,
        upstream: Arc<dyn Upstream>,
        clock: Arc<dyn Clock>,
        request_log: RequestLogger,
    ) -> Self {
        let cache = ResolutionCache::new(store.clone(), clock.clone(), config.cache.ttl());
        let credentials = Arc::new(CredentialManager::new(
            upstream.clone(),
            clock.clone(),
            config.credentials.refresh_skew(),
        ));
        let resolver = Resolver::new(
            cache.clone(),
            credentials.clone(),
            upstream,
            config.upstream.timeout(),
        );

        Self {
            config: Arc::new(config),
            clock,
            store,
            cache,
            credentials,
            resolver,
            request_log,
        }
    }
}
