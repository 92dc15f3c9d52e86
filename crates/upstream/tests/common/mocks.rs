use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strmlink_core::{Credential, FileDescriptor};
use strmlink_upstream::{Upstream, UpstreamResult};
use time::OffsetDateTime;

/// Upstream whose login outcomes are scripted and whose calls are counted.
///
/// Once the script runs out, logins succeed with `token-<n>`.
#[allow(dead_code)]
pub struct ScriptedUpstream {
    logins: AtomicUsize,
    login_script: Mutex<VecDeque<UpstreamResult<()>>>,
    login_delay: Duration,
    expires_at: Option<OffsetDateTime>,
}

#[allow(dead_code)]
impl ScriptedUpstream {
    pub fn new() -> Self {
        Self {
            logins: AtomicUsize::new(0),
            login_script: Mutex::new(VecDeque::new()),
            login_delay: Duration::ZERO,
            expires_at: None,
        }
    }

    /// Make every login take `delay`, widening the window for concurrent callers.
    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.login_delay = delay;
        self
    }

    /// Issued credentials expire at `at`.
    pub fn with_expiry(mut self, at: OffsetDateTime) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Queue the outcome of the next unscripted login.
    pub fn push_login(&self, outcome: UpstreamResult<()>) {
        self.login_script.lock().unwrap().push_back(outcome);
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn login(&self) -> UpstreamResult<Credential> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }
        let scripted = self.login_script.lock().unwrap().pop_front();
        if let Some(Err(e)) = scripted {
            return Err(e);
        }
        Ok(Credential::new(format!("token-{n}"), self.expires_at))
    }

    async fn resolve_download_url(
        &self,
        descriptor: &FileDescriptor,
        credential: &Credential,
    ) -> UpstreamResult<String> {
        Ok(format!(
            "https://cdn.test/{}?auth={}",
            descriptor.fingerprint(),
            credential.token
        ))
    }
}
