//! Session credential ownership and single-flight refresh.

use crate::error::{UpstreamError, UpstreamResult};
use crate::traits::Upstream;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use strmlink_core::{Clock, Credential};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

/// Observable lifecycle of the session credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    /// No login has succeeded yet.
    Uninitialized,
    Valid,
    /// Inside the refresh window, or kept after a failed refresh.
    Expiring,
}

#[derive(Default)]
struct Slot {
    credential: Option<Credential>,
    /// Bumped after every completed login attempt, successful or not.
    attempts: u64,
    last_error: Option<UpstreamError>,
}

/// Owns the process-wide session credential.
///
/// Concurrent callers that find the credential missing or expiring collapse
/// into one login. Reading a valid credential only takes a read lock.
pub struct CredentialManager {
    upstream: Arc<dyn Upstream>,
    clock: Arc<dyn Clock>,
    refresh_skew: Duration,
    slot: RwLock<Slot>,
    refresh_lock: Mutex<()>,
    logins: AtomicU64,
}

impl CredentialManager {
    pub fn new(upstream: Arc<dyn Upstream>, clock: Arc<dyn Clock>, refresh_skew: Duration) -> Self {
        Self {
            upstream,
            clock,
            refresh_skew,
            slot: RwLock::new(Slot::default()),
            refresh_lock: Mutex::new(()),
            logins: AtomicU64::new(0),
        }
    }

    /// Return a credential that is outside its refresh window, logging in if needed.
    pub async fn ensure_valid(&self) -> UpstreamResult<Credential> {
        let observed = {
            let slot = self.read_slot();
            if let Some(credential) = &slot.credential
                && !credential.needs_refresh(self.clock.now(), self.refresh_skew)
            {
                return Ok(credential.clone());
            }
            slot.attempts
        };
        self.refresh_after(observed).await
    }

    /// Replace a credential the upstream refused.
    ///
    /// If another caller already replaced `stale`, its replacement is
    /// returned without a second login.
    pub async fn force_refresh(&self, stale: &Credential) -> UpstreamResult<Credential> {
        let observed = {
            let slot = self.read_slot();
            if let Some(current) = &slot.credential
                && current.token != stale.token
            {
                return Ok(current.clone());
            }
            slot.attempts
        };
        self.refresh_after(observed).await
    }

    pub fn state(&self) -> CredentialState {
        let slot = self.read_slot();
        match &slot.credential {
            None => CredentialState::Uninitialized,
            Some(c) if c.needs_refresh(self.clock.now(), self.refresh_skew) => {
                CredentialState::Expiring
            }
            Some(_) => CredentialState::Valid,
        }
    }

    /// Expiry of the held credential, if one is held and carries an expiry.
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.read_slot()
            .credential
            .as_ref()
            .and_then(|c| c.expires_at)
    }

    /// Message of the most recent login failure, cleared by a successful login.
    pub fn last_error(&self) -> Option<String> {
        self.read_slot().last_error.as_ref().map(|e| e.to_string())
    }

    /// Number of login exchanges started by this manager.
    pub fn login_count(&self) -> u64 {
        self.logins.load(Ordering::Relaxed)
    }

    /// Log in unless some login attempt completed since `observed` was read.
    ///
    /// Callers queue on `refresh_lock`. The first one through logs in; the
    /// rest find `attempts` moved on and share that attempt's outcome.
    async fn refresh_after(&self, observed: u64) -> UpstreamResult<Credential> {
        let _guard = self.refresh_lock.lock().await;

        {
            let slot = self.read_slot();
            if slot.attempts != observed {
                return match (&slot.last_error, &slot.credential) {
                    (Some(err), _) => Err(err.clone()),
                    (None, Some(credential)) => Ok(credential.clone()),
                    (None, None) => Err(UpstreamError::LoginFailed(
                        "no credential after refresh".to_string(),
                    )),
                };
            }
        }

        self.logins.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(attempt = observed + 1, "refreshing upstream session credential");
        let result = self.upstream.login().await;

        let mut slot = self.write_slot();
        slot.attempts += 1;
        match result {
            Ok(credential) => {
                slot.credential = Some(credential.clone());
                slot.last_error = None;
                Ok(credential)
            }
            Err(err) => {
                // The stale credential stays in place; the next caller retries from scratch.
                tracing::warn!(error = %err, "upstream login failed");
                slot.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(|e| e.into_inner())
    }
}
