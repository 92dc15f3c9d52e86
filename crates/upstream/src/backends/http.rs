//! JSON-over-HTTP upstream backend.
//!
//! Every response is an envelope `{"code": i64, "message": str, "data": {...}}`.
//! Envelope codes are mapped to [`UpstreamError`] variants through the code
//! lists in [`UpstreamConfig`].

use crate::error::{UpstreamError, UpstreamResult};
use crate::traits::Upstream;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use strmlink_core::config::UpstreamConfig;
use strmlink_core::{Credential, FileDescriptor};
use time::OffsetDateTime;

/// Envelope codes meaning success. The login endpoint answers 200, the file
/// API answers 0.
const SUCCESS_CODES: [i64; 2] = [0, 200];

/// Longest upstream body excerpt carried in an error message.
const MAX_ERROR_BODY: usize = 256;

#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct LoginData {
    token: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    expire: Option<OffsetDateTime>,
}

#[derive(Deserialize)]
struct DownloadInfoData {
    #[serde(rename = "DownloadUrl")]
    download_url: String,
}

/// Upstream reached over HTTP with reqwest.
pub struct HttpUpstream {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpUpstream {
    pub fn new(config: UpstreamConfig) -> UpstreamResult<Self> {
        config.validate().map_err(UpstreamError::Config)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| UpstreamError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    async fn call<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> UpstreamResult<T> {
        let response = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            UpstreamError::Transient(format!("malformed upstream response: {e}"))
        })?;

        if !SUCCESS_CODES.contains(&envelope.code) {
            return Err(self.classify(envelope.code, envelope.message));
        }

        envelope.data.ok_or_else(|| UpstreamError::Rejected {
            code: envelope.code,
            message: "response carried no data".to_string(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.config.timeout())
        } else {
            UpstreamError::Transient(e.to_string())
        }
    }

    fn classify(&self, code: i64, message: String) -> UpstreamError {
        if self.config.auth_rejected_codes.contains(&code) {
            UpstreamError::AuthRejected(message)
        } else if self.config.not_found_codes.contains(&code) {
            UpstreamError::NotFound(message)
        } else if self.config.quota_codes.contains(&code) {
            UpstreamError::QuotaExceeded(message)
        } else {
            UpstreamError::Rejected { code, message }
        }
    }
}

fn status_error(status: StatusCode, body: &str) -> UpstreamError {
    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    match status {
        StatusCode::UNAUTHORIZED => UpstreamError::AuthRejected(excerpt),
        StatusCode::NOT_FOUND => UpstreamError::NotFound(excerpt),
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::Transient(format!("{status}: {excerpt}")),
        s if s.is_server_error() => UpstreamError::Transient(format!("{status}: {excerpt}")),
        _ => UpstreamError::Rejected {
            code: i64::from(status.as_u16()),
            message: excerpt,
        },
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn login(&self) -> UpstreamResult<Credential> {
        if self.config.passport.is_empty() {
            return Err(UpstreamError::LoginFailed(
                "no upstream passport configured".to_string(),
            ));
        }

        let body = json!({
            "passport": self.config.passport,
            "password": self.config.password,
            "remember": true,
        });

        let data: LoginData = self
            .call(self.http.post(&self.config.login_url).json(&body))
            .await
            .map_err(|e| match e {
                e if e.is_transient() => e,
                other => UpstreamError::LoginFailed(other.to_string()),
            })?;

        if data.token.is_empty() {
            return Err(UpstreamError::LoginFailed(
                "login response carried an empty token".to_string(),
            ));
        }

        tracing::info!(expires_at = ?data.expire, "upstream login succeeded");
        Ok(Credential::new(data.token, data.expire))
    }

    async fn resolve_download_url(
        &self,
        descriptor: &FileDescriptor,
        credential: &Credential,
    ) -> UpstreamResult<String> {
        let body = json!({
            "Etag": descriptor.fingerprint(),
            "FileName": descriptor.name(),
            "Size": descriptor.size(),
            "S3KeyFlag": descriptor.storage_key(),
            "FileID": 0,
            "Type": 0,
            "driveId": 0,
        });

        let data: DownloadInfoData = self
            .call(
                self.http
                    .post(&self.config.download_info_url)
                    .bearer_auth(&credential.token)
                    .json(&body),
            )
            .await?;

        if data.download_url.is_empty() {
            return Err(UpstreamError::Rejected {
                code: 0,
                message: "download info carried an empty URL".to_string(),
            });
        }
        Ok(data.download_url)
    }
}
