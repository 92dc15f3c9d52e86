//! Background eviction timers.
//!
//! Each timer runs its job in a fresh task per tick, so a failing or
//! panicking run is logged and the next tick runs as usual.

use crate::metrics;
use crate::state::AppState;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strmlink_cache::CacheResult;
use strmlink_cache::repos::RequestLogRepo;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the periodic maintenance tasks and stops them on [`shutdown`](Self::shutdown).
pub struct EvictionScheduler {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Default for EvictionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionScheduler {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Start the service's maintenance timers:
    /// - `sweep`: drop expired cache entries
    /// - `safety_sweep`: drop expired entries and trim to `cache.max_entries`
    /// - `request_log_prune`: drop request log records past retention, when enabled
    pub fn start(state: &AppState) -> Self {
        let mut scheduler = Self::new();
        let config = &state.config;

        let cache = state.cache.clone();
        scheduler.every("sweep", config.eviction.sweep_interval(), move || {
            let cache = cache.clone();
            async move { cache.sweep_expired().await }
        });

        let cache = state.cache.clone();
        let max_entries = config.cache.max_entries;
        scheduler.every(
            "safety_sweep",
            config.eviction.safety_interval(),
            move || {
                let cache = cache.clone();
                async move {
                    let mut removed = cache.sweep_expired().await?;
                    if let Some(max) = max_entries {
                        removed += cache.enforce_capacity(max).await?;
                    }
                    Ok(removed)
                }
            },
        );

        if config.request_log.enabled {
            let store = state.store.clone();
            let clock = state.clock.clone();
            let retention = config.request_log.retention();
            scheduler.every(
                "request_log_prune",
                config.request_log.prune_interval(),
                move || {
                    let store = store.clone();
                    let clock = clock.clone();
                    async move {
                        match clock.now().checked_sub(retention) {
                            Some(cutoff) => store.delete_requests_before(cutoff).await,
                            None => Ok(0),
                        }
                    }
                },
            );
        }

        tracing::info!(
            sweep_interval_secs = config.eviction.sweep_interval_secs,
            safety_interval_secs = config.eviction.safety_interval_secs,
            max_entries = ?config.cache.max_entries,
            "eviction scheduler started"
        );
        scheduler
    }

    /// Run `job` now and then every `period` until shutdown.
    ///
    /// The job returns the number of rows it removed. Both the call to `job`
    /// and the future it returns run inside the per-tick task.
    pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CacheResult<u64>> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let job = Arc::new(job);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let job = job.clone();
                match tokio::spawn(async move { job().await }).await {
                    Ok(Ok(removed)) => {
                        metrics::EVICTED_ENTRIES
                            .with_label_values(&[name])
                            .inc_by(removed);
                        if removed > 0 {
                            tracing::info!(task = name, removed, "maintenance run removed rows");
                        } else {
                            tracing::debug!(task = name, "maintenance run found nothing to remove");
                        }
                    }
                    Ok(Err(e)) => {
                        metrics::SCHEDULER_FAILURES.with_label_values(&[name]).inc();
                        tracing::error!(task = name, error = %e, "maintenance run failed");
                    }
                    Err(join_err) => {
                        metrics::SCHEDULER_FAILURES.with_label_values(&[name]).inc();
                        tracing::error!(task = name, error = %join_err, "maintenance run panicked");
                    }
                }
            }
            tracing::debug!(task = name, "maintenance timer stopped");
        });
        self.tasks.push(handle);
    }

    /// Stop every timer and wait for in-flight runs to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "maintenance timer ended abnormally");
            }
        }
    }
}
