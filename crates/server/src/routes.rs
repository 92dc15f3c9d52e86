//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
///
/// Fixed routes win over the descriptor wildcard, so a file literally named
/// `metrics` cannot be redirected while the metrics endpoint is enabled.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/status", get(handlers::status));

    // The metrics endpoint should be network-restricted to the scraper.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // `get` also answers HEAD with the same status and headers.
    router
        .route("/{*descriptor}", get(handlers::redirect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
