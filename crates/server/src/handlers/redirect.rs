//! GET/HEAD /{descriptor} - redirect a descriptor to its download URL.

use crate::error::{ApiError, ErrorKind};
use crate::metrics;
use crate::state::AppState;
use axum::extract::{Path, RawQuery, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Instant;
use strmlink_cache::RequestLogRow;

/// Rebuild the raw descriptor from the request target.
///
/// The storage key travels as the query string, so `a.mkv|1|ab?key` arrives
/// as path `a.mkv|1|ab` plus query `key`. A percent-encoded `?` inside the
/// path already carries its own key and the query string is ignored.
pub fn raw_descriptor(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() && !path.contains('?') => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}

pub async fn redirect(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let raw = raw_descriptor(&path, query.as_deref());
    let started = Instant::now();

    let result = state.resolver.resolve(&raw).await.and_then(|resolution| {
        let location = HeaderValue::try_from(resolution.url.as_str()).map_err(|e| {
            ApiError::Internal(format!("upstream returned an unusable URL: {e}"))
        })?;
        Ok((resolution, location))
    });

    let elapsed = started.elapsed();
    metrics::REQUEST_DURATION.observe(elapsed.as_secs_f64());

    let (outcome, response) = match result {
        Ok((resolution, location)) => {
            tracing::info!(
                descriptor = %raw,
                source = resolution.source.as_str(),
                url = %resolution.url,
                "redirecting"
            );
            (
                resolution.source.as_str(),
                (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
            )
        }
        Err(err) => {
            let kind = err.kind();
            match kind {
                ErrorKind::Internal => {
                    tracing::error!(descriptor = %raw, error = %err, "resolution failed")
                }
                ErrorKind::InvalidDescriptor | ErrorKind::UpstreamNotFound => {
                    tracing::info!(descriptor = %raw, error = %err, "resolution refused")
                }
                _ => tracing::warn!(descriptor = %raw, error = %err, "resolution failed"),
            }
            (kind.as_str(), err.into_response())
        }
    };

    metrics::REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    state.request_log.record(RequestLogRow {
        requested_at: state.clock.now(),
        method: method.to_string(),
        descriptor: raw,
        outcome: outcome.to_string(),
        status: response.status().as_u16(),
        latency_ms: elapsed.as_millis().try_into().unwrap_or(u64::MAX),
    });

    response
}
