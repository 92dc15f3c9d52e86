//! Integration tests for the redirect endpoint.

mod common;

use axum::http::StatusCode;
use common::{FP_A, FP_B, FakeUpstream, TestServer, location};
use std::time::Duration;
use strmlink_core::CacheKey;
use strmlink_core::config::StoreConfig;
use strmlink_upstream::UpstreamError;

fn uri(name: &str, size: u64, fingerprint: &str) -> String {
    format!("/{name}%7C{size}%7C{fingerprint}")
}

#[tokio::test]
async fn test_miss_redirects_to_upstream_url() {
    let server = TestServer::new().await;

    let response = server.send("GET", &uri("movie.mkv", 1024, FP_A)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response).unwrap(),
        format!("https://cdn.test/{FP_A}?auth=token-1")
    );
    assert_eq!(server.upstream.logins(), 1);
    assert_eq!(server.upstream.resolves(), 1);
}

#[tokio::test]
async fn test_hit_skips_upstream() {
    let server = TestServer::new().await;
    let target = uri("movie.mkv", 1024, FP_A);

    let first = server.send("GET", &target).await;
    let second = server.send("GET", &target).await;

    assert_eq!(second.status(), StatusCode::FOUND);
    assert_eq!(location(&first), location(&second));
    assert_eq!(server.upstream.resolves(), 1);
}

#[tokio::test]
async fn test_head_redirects_without_body() {
    let server = TestServer::new().await;

    let response = server.send("HEAD", &uri("movie.mkv", 1024, FP_A)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(location(&response).is_some());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_query_string_is_storage_key() {
    let server = TestServer::new().await;
    let base = uri("movie.mkv", 1024, FP_A);

    server.send("GET", &format!("{base}?flagA")).await;
    server.send("GET", &format!("{base}?flagB")).await;
    server.send("GET", &format!("{base}?flagA")).await;

    assert_eq!(server.upstream.resolves(), 2);
    for key in ["flagA", "flagB"] {
        assert!(
            server
                .state
                .cache
                .lookup(&CacheKey::new(FP_A, key))
                .await
                .unwrap()
                .is_some(),
            "missing entry for {key}"
        );
    }
}

#[tokio::test]
async fn test_fingerprint_case_shares_entry() {
    let server = TestServer::new().await;

    server.send("GET", &uri("a.mkv", 1, FP_A)).await;
    let response = server
        .send("GET", &uri("renamed.mkv", 1, &FP_A.to_uppercase()))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(server.upstream.resolves(), 1);
}

#[tokio::test]
async fn test_malformed_descriptor_is_bad_request() {
    let server = TestServer::new().await;

    let (status, body) = server.get_json("/only%7Cone-separator").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["state"], false);
    assert_eq!(body["code"], "invalid_descriptor");
    assert!(body["message"].as_str().unwrap().contains("only|one-separator"));
    assert_eq!(server.upstream.logins(), 0);
    assert_eq!(server.upstream.resolves(), 0);
    assert_eq!(server.state.cache.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_non_numeric_size_is_bad_request() {
    let server = TestServer::new().await;

    let (status, body) = server.get_json(&format!("/a.mkv%7Cbig%7C{FP_A}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_descriptor");
}

#[tokio::test]
async fn test_auth_rejection_refreshes_and_retries_once() {
    let upstream = FakeUpstream::new();
    upstream.push_resolve(Err(UpstreamError::AuthRejected("token expired".into())));
    let server = TestServer::with_upstream(upstream).await;

    let response = server.send("GET", &uri("movie.mkv", 1024, FP_A)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response).unwrap(),
        format!("https://cdn.test/{FP_A}?auth=token-2")
    );
    assert_eq!(server.upstream.logins(), 2);
    assert_eq!(server.upstream.tokens_seen(), vec!["token-1", "token-2"]);
}

#[tokio::test]
async fn test_second_auth_rejection_is_not_retried() {
    let upstream = FakeUpstream::new();
    upstream.push_resolve(Err(UpstreamError::AuthRejected("expired".into())));
    upstream.push_resolve(Err(UpstreamError::AuthRejected("still expired".into())));
    let server = TestServer::with_upstream(upstream).await;

    let (status, body) = server.get_json(&uri("movie.mkv", 1024, FP_A)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "auth_failure");
    assert_eq!(server.upstream.resolves(), 2);
    assert_eq!(server.upstream.logins(), 2);
}

#[tokio::test]
async fn test_login_failure_is_bad_gateway() {
    let upstream = FakeUpstream::new();
    upstream.push_login(Err(UpstreamError::LoginFailed("wrong password".into())));
    let server = TestServer::with_upstream(upstream).await;

    let (status, body) = server.get_json(&uri("movie.mkv", 1024, FP_A)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "auth_failure");
    assert_eq!(server.upstream.resolves(), 0);

    // The next request logs in again and succeeds.
    let response = server.send("GET", &uri("movie.mkv", 1024, FP_A)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_not_found_is_not_cached() {
    let upstream = FakeUpstream::new();
    upstream.push_resolve(Err(UpstreamError::NotFound("no such file".into())));
    let server = TestServer::with_upstream(upstream).await;
    let target = uri("gone.mkv", 1, FP_B);

    let (status, body) = server.get_json(&target).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "upstream_not_found");

    let response = server.send("GET", &target).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(server.upstream.resolves(), 2);
}

#[tokio::test]
async fn test_quota_exceeded_is_bad_gateway_without_retry_hint() {
    let upstream = FakeUpstream::new();
    upstream.push_resolve(Err(UpstreamError::QuotaExceeded("daily limit".into())));
    let server = TestServer::with_upstream(upstream).await;

    let response = server.send("GET", &uri("movie.mkv", 1024, FP_A)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(response.headers().get("retry-after").is_none());
}

#[tokio::test]
async fn test_slow_upstream_times_out_with_retry_hint() {
    let mut config = strmlink_core::config::AppConfig::for_testing();
    config.upstream.timeout_secs = 1;
    let upstream = FakeUpstream::new().with_resolve_delay(Duration::from_secs(3));
    let server = TestServer::build(config, upstream).await;

    let response = server.send("GET", &uri("movie.mkv", 1024, FP_A)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers().get("retry-after").unwrap(), "30");
    assert!(
        server
            .state
            .cache
            .lookup(&CacheKey::new(FP_A, ""))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let server = TestServer::new().await;
    let target = uri("movie.mkv", 1024, FP_A);

    server.send("GET", &target).await;
    server
        .clock
        .advance(time::Duration::hours(20) - time::Duration::seconds(1));
    server.send("GET", &target).await;
    assert_eq!(server.upstream.resolves(), 1);

    server.clock.advance(time::Duration::seconds(1));
    server.send("GET", &target).await;
    assert_eq!(server.upstream.resolves(), 2);
}

#[tokio::test]
async fn test_concurrent_cold_start_logs_in_once() {
    let server = TestServer::new().await;

    let requests = (0..16u64).map(|size| {
        let target = uri("movie.mkv", size, FP_A);
        let server = &server;
        async move { server.send("GET", &target).await.status() }
    });
    let statuses = futures::future::join_all(requests).await;

    assert!(statuses.iter().all(|s| *s == StatusCode::FOUND));
    assert_eq!(server.upstream.logins(), 1);
}

#[tokio::test]
async fn test_sqlite_store_serves_hits() {
    let server = TestServer::with_config(|config| {
        config.store = StoreConfig::Sqlite {
            path: Default::default(),
            query_timeout_secs: Some(30),
        };
    })
    .await;
    let target = format!("{}?flag", uri("movie.mkv", 1024, FP_A));

    server.send("GET", &target).await;
    let response = server.send("GET", &target).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(server.upstream.resolves(), 1);
    assert_eq!(server.state.store.backend(), "sqlite");
}

#[tokio::test]
async fn test_requests_are_logged_when_enabled() {
    use strmlink_cache::repos::RequestLogRepo;

    let server = TestServer::with_config(|config| {
        config.request_log.enabled = true;
    })
    .await;

    server.send("GET", &uri("movie.mkv", 1024, FP_A)).await;
    server.send("GET", &uri("movie.mkv", 1024, FP_A)).await;
    server.send("GET", "/broken").await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let count = server.state.store.count_requests().await.unwrap();
        if count == 3 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "only {count} request log records written"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
