//! API error types.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use strmlink_cache::CacheError;
use strmlink_upstream::UpstreamError;

/// Seconds a client is told to wait after a transient upstream failure.
pub const RETRY_AFTER_SECS: u64 = 30;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `false`; kept for clients written against the `{state, message}` shape.
    pub state: bool,
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Outcome class of a failed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidDescriptor,
    AuthFailure,
    UpstreamNotFound,
    UpstreamQuotaExceeded,
    UpstreamTransient,
    /// Upstream refused with a code not mapped to any other kind.
    UpstreamRejected,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDescriptor => "invalid_descriptor",
            Self::AuthFailure => "auth_failure",
            Self::UpstreamNotFound => "upstream_not_found",
            Self::UpstreamQuotaExceeded => "upstream_quota_exceeded",
            Self::UpstreamTransient => "upstream_transient",
            Self::UpstreamRejected => "upstream_rejected",
            Self::Internal => "internal_error",
        }
    }
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Descriptor(#[from] strmlink_core::Error),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Descriptor(strmlink_core::Error::InvalidDescriptor { .. }) => {
                ErrorKind::InvalidDescriptor
            }
            Self::Descriptor(_) => ErrorKind::Internal,
            Self::Upstream(e) => match e {
                UpstreamError::AuthRejected(_) | UpstreamError::LoginFailed(_) => {
                    ErrorKind::AuthFailure
                }
                UpstreamError::NotFound(_) => ErrorKind::UpstreamNotFound,
                UpstreamError::QuotaExceeded(_) => ErrorKind::UpstreamQuotaExceeded,
                UpstreamError::Transient(_) | UpstreamError::Timeout(_) => {
                    ErrorKind::UpstreamTransient
                }
                UpstreamError::Rejected { .. } => ErrorKind::UpstreamRejected,
                UpstreamError::Config(_) => ErrorKind::Internal,
            },
            Self::Cache(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidDescriptor => StatusCode::BAD_REQUEST,
            ErrorKind::UpstreamNotFound => StatusCode::NOT_FOUND,
            ErrorKind::AuthFailure
            | ErrorKind::UpstreamQuotaExceeded
            | ErrorKind::UpstreamTransient
            | ErrorKind::UpstreamRejected => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry = self.kind() == ErrorKind::UpstreamTransient;
        let body = ErrorResponse {
            state: false,
            code: self.code().to_string(),
            message: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        if retry {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
