//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use time::Duration;

/// Upper bound for any configured lifetime, about 100 years.
///
/// Keeps `now ± duration` inside the representable date range.
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

fn check_duration(field: &str, secs: u64) -> Result<(), String> {
    if secs > MAX_DURATION_SECS {
        return Err(format!(
            "{field} {secs} exceeds the maximum of {MAX_DURATION_SECS} seconds"
        ));
    }
    Ok(())
}

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8123").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Verbose logging. Overridden by `RUST_LOG` when that is set.
    #[serde(default)]
    pub debug: bool,
    /// Expose the Prometheus `/metrics` endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "0.0.0.0:8123".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            debug: false,
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Backing store for the resolution cache and request log.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// SQLite database file. Survives restarts.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds (advisory only).
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
    /// Process-local map. Lost on restart; intended for tests and ephemeral deployments.
    Memory,
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/strmlink.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

/// Resolution cache policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a resolved URL in seconds (default: 20 hours).
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Soft limit on stored entries. The safety sweep trims oldest-first down to it.
    #[serde(default)]
    pub max_entries: Option<u64>,
}

fn default_cache_ttl_secs() -> u64 {
    crate::DEFAULT_CACHE_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: None,
        }
    }
}

impl CacheConfig {
    /// Get the TTL as a Duration.
    pub fn ttl(&self) -> Duration {
        // Saturate at i64::MAX to prevent overflow wrapping to negative
        Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_secs == 0 {
            return Err("cache.ttl_secs must be greater than 0".to_string());
        }
        check_duration("cache.ttl_secs", self.ttl_secs)
    }
}

/// Session credential policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Refresh this many seconds before the credential expires (default: 300).
    #[serde(default = "default_refresh_skew_secs")]
    pub refresh_skew_secs: u64,
}

fn default_refresh_skew_secs() -> u64 {
    crate::DEFAULT_REFRESH_SKEW_SECS
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            refresh_skew_secs: default_refresh_skew_secs(),
        }
    }
}

impl CredentialConfig {
    pub fn refresh_skew(&self) -> Duration {
        Duration::seconds(i64::try_from(self.refresh_skew_secs).unwrap_or(i64::MAX))
    }

    pub fn validate(&self) -> Result<(), String> {
        check_duration("credentials.refresh_skew_secs", self.refresh_skew_secs)
    }
}

/// Upstream storage API configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Account identifier for the login exchange.
    #[serde(default)]
    pub passport: String,
    /// Account password.
    /// WARNING: Prefer STRMLINK_UPSTREAM__PASSWORD over storing it in a config file.
    #[serde(default)]
    pub password: String,
    /// Login endpoint.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Download-info endpoint.
    #[serde(default = "default_download_info_url")]
    pub download_info_url: String,
    /// Per-call timeout in seconds (default: 20).
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
    /// User-Agent sent upstream.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Envelope codes meaning the session token was rejected.
    #[serde(default = "default_auth_rejected_codes")]
    pub auth_rejected_codes: Vec<i64>,
    /// Envelope codes meaning the file does not exist.
    #[serde(default = "default_not_found_codes")]
    pub not_found_codes: Vec<i64>,
    /// Envelope codes meaning the account's download quota is exhausted.
    #[serde(default = "default_quota_codes")]
    pub quota_codes: Vec<i64>,
}

fn default_login_url() -> String {
    "https://login.123pan.com/api/user/sign_in".to_string()
}

fn default_download_info_url() -> String {
    "https://www.123pan.com/b/api/file/download_info".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    concat!("strmlink/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_auth_rejected_codes() -> Vec<i64> {
    vec![401]
}

fn default_not_found_codes() -> Vec<i64> {
    vec![404]
}

fn default_quota_codes() -> Vec<i64> {
    vec![5113]
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            passport: String::new(),
            password: String::new(),
            login_url: default_login_url(),
            download_info_url: default_download_info_url(),
            timeout_secs: default_upstream_timeout_secs(),
            user_agent: default_user_agent(),
            auth_rejected_codes: default_auth_rejected_codes(),
            not_found_codes: default_not_found_codes(),
            quota_codes: default_quota_codes(),
        }
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("passport", &self.passport)
            .field("password", &"<redacted>")
            .field("login_url", &self.login_url)
            .field("download_info_url", &self.download_info_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("auth_rejected_codes", &self.auth_rejected_codes)
            .field("not_found_codes", &self.not_found_codes)
            .field("quota_codes", &self.quota_codes)
            .finish()
    }
}

impl UpstreamConfig {
    /// Get the per-call timeout as a std::time::Duration.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("upstream.timeout_secs must be greater than 0".to_string());
        }
        if self.login_url.is_empty() || self.download_info_url.is_empty() {
            return Err(
                "upstream.login_url and upstream.download_info_url must be set".to_string(),
            );
        }
        Ok(())
    }
}

/// Background eviction timers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Seconds between expired-entry sweeps (default: 30 minutes).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Seconds between safety sweeps that also enforce `cache.max_entries`
    /// (default: 48 hours).
    #[serde(default = "default_safety_interval_secs")]
    pub safety_interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    30 * 60
}

fn default_safety_interval_secs() -> u64 {
    48 * 60 * 60
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            safety_interval_secs: default_safety_interval_secs(),
        }
    }
}

impl EvictionConfig {
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn safety_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.safety_interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        // tokio::time::interval panics on a zero period
        if self.sweep_interval_secs == 0 || self.safety_interval_secs == 0 {
            return Err("eviction intervals must be at least 1 second".to_string());
        }
        check_duration("eviction.sweep_interval_secs", self.sweep_interval_secs)?;
        check_duration("eviction.safety_interval_secs", self.safety_interval_secs)
    }
}

/// Request log retention.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestLogConfig {
    /// Record inbound requests (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Keep rows this many seconds (default: 7 days).
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Seconds between prune runs (default: 1 hour).
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
    /// Records buffered between the request path and the writer.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_retention_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_prune_interval_secs() -> u64 {
    60 * 60
}

fn default_buffer_size() -> usize {
    1024
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            retention_secs: default_retention_secs(),
            prune_interval_secs: default_prune_interval_secs(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl RequestLogConfig {
    pub fn retention(&self) -> Duration {
        Duration::seconds(i64::try_from(self.retention_secs).unwrap_or(i64::MAX))
    }

    pub fn prune_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.prune_interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        check_duration("request_log.retention_secs", self.retention_secs)?;
        if !self.enabled {
            return Ok(());
        }
        if self.prune_interval_secs == 0 {
            return Err("request_log.prune_interval_secs must be at least 1 second".to_string());
        }
        check_duration("request_log.prune_interval_secs", self.prune_interval_secs)?;
        if self.buffer_size == 0 {
            return Err("request_log.buffer_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub credentials: CredentialConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub eviction: EvictionConfig,
    #[serde(default)]
    pub request_log: RequestLogConfig,
}

impl AppConfig {
    /// Create a test configuration backed by the in-memory store.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            store: StoreConfig::Memory,
            ..Default::default()
        }
    }

    /// Validate every section, returning the first problem found.
    pub fn validate(&self) -> crate::Result<()> {
        self.cache
            .validate()
            .and_then(|_| self.credentials.validate())
            .and_then(|_| self.upstream.validate())
            .and_then(|_| self.eviction.validate())
            .and_then(|_| self.request_log.validate())
            .map_err(crate::Error::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.cache.ttl(), Duration::hours(20));
        assert_eq!(config.credentials.refresh_skew(), Duration::minutes(5));
        assert_eq!(
            config.eviction.sweep_interval(),
            std::time::Duration::from_secs(1800)
        );
        assert_eq!(
            config.eviction.safety_interval(),
            std::time::Duration::from_secs(172800)
        );
        assert_eq!(config.request_log.retention(), Duration::days(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_config_deserialize_tagged() {
        let json = r#"{"type":"sqlite","path":"/tmp/x.db"}"#;
        match serde_json::from_str::<StoreConfig>(json).unwrap() {
            StoreConfig::Sqlite {
                path,
                query_timeout_secs,
            } => {
                assert_eq!(path, PathBuf::from("/tmp/x.db"));
                assert_eq!(query_timeout_secs, Some(30));
            }
            StoreConfig::Memory => panic!("expected sqlite config"),
        }

        let memory: StoreConfig = serde_json::from_str(r#"{"type":"memory"}"#).unwrap();
        assert!(matches!(memory, StoreConfig::Memory));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"cache":{"max_entries":10},"upstream":{"passport":"me"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cache.max_entries, Some(10));
        assert_eq!(config.cache.ttl_secs, 72000);
        assert_eq!(config.upstream.passport, "me");
        assert_eq!(config.upstream.auth_rejected_codes, vec![401]);
        assert_eq!(config.server.bind, "0.0.0.0:8123");
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = AppConfig::for_testing();
        config.cache.ttl_secs = 0;
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = AppConfig::for_testing();
        config.eviction.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::for_testing();
        config.request_log.enabled = true;
        config.request_log.prune_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_lifetimes_past_the_date_range() {
        let mut config = AppConfig::for_testing();
        config.cache.ttl_secs = 1_000_000_000_000;
        assert!(matches!(config.validate(), Err(crate::Error::Config(msg)) if msg.contains("cache.ttl_secs")));

        let mut config = AppConfig::for_testing();
        config.credentials.refresh_skew_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(crate::Error::Config(msg)) if msg.contains("refresh_skew_secs")));

        // Checked even while the log is disabled.
        let mut config = AppConfig::for_testing();
        config.request_log.retention_secs = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = AppConfig::for_testing();
        config.eviction.safety_interval_secs = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_maximum_lifetime() {
        let mut config = AppConfig::for_testing();
        config.cache.ttl_secs = MAX_DURATION_SECS;
        config.credentials.refresh_skew_secs = MAX_DURATION_SECS;
        config.request_log.retention_secs = MAX_DURATION_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_upstream_debug_redacts_password() {
        let config = UpstreamConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
