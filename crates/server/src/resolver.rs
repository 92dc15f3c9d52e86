//! Descriptor resolution: cache first, then upstream with one auth retry.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use std::sync::Arc;
use std::time::Duration;
use strmlink_cache::ResolutionCache;
use strmlink_core::{CacheKey, Credential, FileDescriptor};
use strmlink_upstream::{CredentialManager, Upstream, UpstreamError, UpstreamResult};

/// Where a resolved URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Cache,
    Upstream,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Upstream => "upstream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub source: ResolutionSource,
}

/// Resolves raw descriptors to redirect targets.
#[derive(Clone)]
pub struct Resolver {
    cache: ResolutionCache,
    credentials: Arc<CredentialManager>,
    upstream: Arc<dyn Upstream>,
    upstream_timeout: Duration,
}

impl Resolver {
    pub fn new(
        cache: ResolutionCache,
        credentials: Arc<CredentialManager>,
        upstream: Arc<dyn Upstream>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            credentials,
            upstream,
            upstream_timeout,
        }
    }

    /// Resolve `raw` (`name|size|fingerprint[?storage_key]`) to a download URL.
    ///
    /// A cache hit returns without touching credentials or the network.
    pub async fn resolve(&self, raw: &str) -> ApiResult<Resolution> {
        let descriptor = FileDescriptor::parse(raw)?;
        let key = descriptor.cache_key();

        match self.cache.lookup(&key).await {
            Ok(Some(entry)) => {
                metrics::CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                return Ok(Resolution {
                    url: entry.redirect_url,
                    source: ResolutionSource::Cache,
                });
            }
            Ok(None) => {
                metrics::CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
            }
            Err(e) => {
                // Treated as a miss; the upstream can still answer.
                metrics::CACHE_LOOKUPS.with_label_values(&["error"]).inc();
                tracing::warn!(key = %key, error = %e, "cache lookup failed");
            }
        }

        // Detached so a client disconnect cannot abort the upstream call or
        // the cache write that follows it.
        let this = self.clone();
        tokio::spawn(async move { this.resolve_miss(descriptor, key).await })
            .await
            .map_err(|e| ApiError::Internal(format!("resolution task failed: {e}")))?
    }

    async fn resolve_miss(&self, descriptor: FileDescriptor, key: CacheKey) -> ApiResult<Resolution> {
        let credential = self.credentials.ensure_valid().await?;

        let url = match self.call_upstream(&descriptor, &credential).await {
            Err(UpstreamError::AuthRejected(reason)) => {
                tracing::info!(
                    key = %key,
                    reason = %reason,
                    "upstream rejected session credential, refreshing once"
                );
                metrics::AUTH_RETRIES.inc();
                let fresh = self.credentials.force_refresh(&credential).await?;
                self.call_upstream(&descriptor, &fresh).await?
            }
            other => other?,
        };

        if let Err(e) = self.cache.put(&key, &url).await {
            metrics::CACHE_WRITE_FAILURES.inc();
            tracing::warn!(key = %key, error = %e, "failed to cache resolved URL");
        }

        Ok(Resolution {
            url,
            source: ResolutionSource::Upstream,
        })
    }

    async fn call_upstream(
        &self,
        descriptor: &FileDescriptor,
        credential: &Credential,
    ) -> UpstreamResult<String> {
        let timer = metrics::UPSTREAM_DURATION.start_timer();
        let result = tokio::time::timeout(
            self.upstream_timeout,
            self.upstream.resolve_download_url(descriptor, credential),
        )
        .await
        .unwrap_or(Err(UpstreamError::Timeout(self.upstream_timeout)));
        timer.observe_duration();

        let outcome = match &result {
            Ok(_) => "ok",
            Err(UpstreamError::AuthRejected(_)) => "auth_rejected",
            Err(UpstreamError::NotFound(_)) => "not_found",
            Err(UpstreamError::QuotaExceeded(_)) => "quota_exceeded",
            Err(UpstreamError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        metrics::UPSTREAM_CALLS.with_label_values(&[outcome]).inc();
        result
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }
}
