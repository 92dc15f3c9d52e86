//! In-process upstream double.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strmlink_core::{Credential, FileDescriptor};
use strmlink_upstream::{Upstream, UpstreamResult};
use time::OffsetDateTime;

/// Upstream with scripted login and resolve outcomes.
///
/// Unscripted logins issue `token-<n>`; unscripted resolves answer
/// `https://cdn.test/<fingerprint>?auth=<token>`.
#[allow(dead_code)]
pub struct FakeUpstream {
    logins: AtomicUsize,
    resolves: AtomicUsize,
    login_script: Mutex<VecDeque<UpstreamResult<()>>>,
    resolve_script: Mutex<VecDeque<UpstreamResult<String>>>,
    tokens_seen: Mutex<Vec<String>>,
    resolve_delay: Duration,
    expires_at: Option<OffsetDateTime>,
}

impl Default for FakeUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl FakeUpstream {
    pub fn new() -> Self {
        Self {
            logins: AtomicUsize::new(0),
            resolves: AtomicUsize::new(0),
            login_script: Mutex::new(VecDeque::new()),
            resolve_script: Mutex::new(VecDeque::new()),
            tokens_seen: Mutex::new(Vec::new()),
            resolve_delay: Duration::ZERO,
            expires_at: None,
        }
    }

    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }

    pub fn with_expiry(mut self, at: OffsetDateTime) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn push_login(&self, outcome: UpstreamResult<()>) {
        self.login_script.lock().unwrap().push_back(outcome);
    }

    pub fn push_resolve(&self, outcome: UpstreamResult<String>) {
        self.resolve_script.lock().unwrap().push_back(outcome);
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    /// Tokens presented to resolve, in call order.
    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn login(&self) -> UpstreamResult<Credential> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
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
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(credential.token.clone());
        if !self.resolve_delay.is_zero() {
            tokio::time::sleep(self.resolve_delay).await;
        }
        let scripted = self.resolve_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(format!(
                "https://cdn.test/{}?auth={}",
                descriptor.fingerprint(),
                credential.token
            ))
        })
    }
}
