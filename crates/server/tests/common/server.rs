//! Server test utilities.

use super::mocks::FakeUpstream;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use strmlink_core::ManualClock;
use strmlink_core::config::{AppConfig, StoreConfig};
use strmlink_server::{AppState, RequestLogger, create_router};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// A router wired to a fake upstream and a manual clock.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub upstream: Arc<FakeUpstream>,
    pub clock: Arc<ManualClock>,
    pub request_log_writer: Option<JoinHandle<()>>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// In-memory store, default upstream.
    pub async fn new() -> Self {
        Self::build(AppConfig::for_testing(), FakeUpstream::new()).await
    }

    /// In-memory store with config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = AppConfig::for_testing();
        modifier(&mut config);
        Self::build(config, FakeUpstream::new()).await
    }

    pub async fn with_upstream(upstream: FakeUpstream) -> Self {
        Self::build(AppConfig::for_testing(), upstream).await
    }

    /// Build from explicit parts. A SQLite store is relocated into a
    /// temporary directory owned by the server.
    pub async fn build(mut config: AppConfig, upstream: FakeUpstream) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        if let StoreConfig::Sqlite { path, .. } = &mut config.store {
            *path = temp_dir.path().join("strmlink.db");
        }

        let store = strmlink_cache::from_config(&config.store)
            .await
            .expect("Failed to create resolution store");
        let upstream = Arc::new(upstream);
        let clock = Arc::new(ManualClock::starting_now());

        let (request_log, request_log_writer) = if config.request_log.enabled {
            let (logger, writer) =
                RequestLogger::spawn(store.clone(), config.request_log.buffer_size);
            (logger, Some(writer))
        } else {
            (RequestLogger::disabled(), None)
        };

        let state = AppState::new(
            config,
            store,
            upstream.clone(),
            clock.clone(),
            request_log,
        );
        let router = create_router(state.clone());

        Self {
            router,
            state,
            upstream,
            clock,
            request_log_writer,
            _temp_dir: temp_dir,
        }
    }

    pub async fn send(&self, method: &str, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET `uri` and return the status with the body parsed as JSON
    /// (`Null` when empty or not JSON).
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let response = self.send("GET", uri).await;
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

/// The `Location` header of a response, if any.
#[allow(dead_code)]
pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
