//! Prometheus metrics for the strmlink server.
//!
//! Labels carry outcome classes only, never descriptors or URLs.
//!
//! The `/metrics` endpoint is unauthenticated. Restrict it to the scraper's
//! network at the infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Request metrics
pub static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "strmlink_requests_total",
            "Redirect requests by outcome (cache, upstream, or error kind)",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static REQUEST_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "strmlink_request_duration_seconds",
            "Time to answer a redirect request",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
    )
    .expect("metric creation failed")
});

// Cache metrics
pub static CACHE_LOOKUPS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "strmlink_cache_lookups_total",
            "Resolution cache lookups by result (hit, miss, error)",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static CACHE_WRITE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "strmlink_cache_write_failures_total",
        "Resolved URLs served but not cached because the store write failed",
    )
    .expect("metric creation failed")
});

pub static EVICTED_ENTRIES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "strmlink_evicted_total",
            "Rows removed by background maintenance, by task",
        ),
        &["task"],
    )
    .expect("metric creation failed")
});

pub static SCHEDULER_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "strmlink_scheduler_failures_total",
            "Background maintenance runs that failed or panicked, by task",
        ),
        &["task"],
    )
    .expect("metric creation failed")
});

// Upstream metrics
pub static UPSTREAM_CALLS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "strmlink_upstream_calls_total",
            "Upstream download-URL resolutions by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static UPSTREAM_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "strmlink_upstream_duration_seconds",
            "Duration of upstream download-URL resolutions",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0]),
    )
    .expect("metric creation failed")
});

pub static AUTH_RETRIES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "strmlink_auth_retries_total",
        "Upstream calls retried after the session credential was rejected",
    )
    .expect("metric creation failed")
});

// Request log metrics
pub static REQUEST_LOG_DROPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "strmlink_request_log_dropped_total",
        "Request log records dropped because the writer fell behind",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests may build any number of routers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(REQUESTS_TOTAL.clone()),
            Box::new(REQUEST_DURATION.clone()),
            Box::new(CACHE_LOOKUPS.clone()),
            Box::new(CACHE_WRITE_FAILURES.clone()),
            Box::new(EVICTED_ENTRIES.clone()),
            Box::new(SCHEDULER_FAILURES.clone()),
            Box::new(UPSTREAM_CALLS.clone()),
            Box::new(UPSTREAM_DURATION.clone()),
            Box::new(AUTH_RETRIES.clone()),
            Box::new(REQUEST_LOG_DROPPED.clone()),
        ];
        for collector in collectors {
            REGISTRY
                .register(collector)
                .expect("metric registration failed");
        }
    });
}

/// Handler for the `/metrics` endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
