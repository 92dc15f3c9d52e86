//! Health and status endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use strmlink_upstream::CredentialState;
use time::format_description::well_known::Rfc3339;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /v1/health - Health check.
///
/// Only checks the store; an unreachable upstream does not make the
/// service unhealthy because cached descriptors still resolve.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.store.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub backend: &'static str,
    pub entries: u64,
    pub ttl_secs: i64,
    pub max_entries: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub state: CredentialState,
    /// RFC 3339, absent when the credential has no expiry or none is held.
    pub expires_at: Option<String>,
    pub logins: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub cache: CacheStatus,
    pub credential: CredentialStatus,
}

/// GET /v1/status - Cache and session overview.
///
/// Never includes the session token itself.
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let entries = state.cache.len().await?;
    let credentials = &state.credentials;

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        cache: CacheStatus {
            backend: state.store.backend(),
            entries,
            ttl_secs: state.cache.ttl().whole_seconds(),
            max_entries: state.config.cache.max_entries,
        },
        credential: CredentialStatus {
            state: credentials.state(),
            expires_at: credentials
                .expires_at()
                .and_then(|at| at.format(&Rfc3339).ok()),
            logins: credentials.login_count(),
            last_error: credentials.last_error(),
        },
    }))
}
