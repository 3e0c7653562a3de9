//! In-process secret source.
//!
//! Holds secrets in memory. Useful for embedding static configuration
//! and for exercising refresh behaviour: failures can be injected for the
//! next N fetches, and authentication can be made to reject.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use super::{Credentials, SecretSource};
use crate::core::types::SecretMap;
use crate::error::{AuthError, Result, TransportError};

#[derive(Debug)]
pub struct MemorySource {
    label: String,
    secrets: RwLock<SecretMap>,
    expected_client: Option<String>,
    authenticated: AtomicBool,
    healthy: AtomicBool,
    fail_next: AtomicU32,
    reject_auth: AtomicBool,
    delay: RwLock<Duration>,
    fetches: AtomicU64,
    auths: AtomicU64,
}

impl MemorySource {
    pub fn new(secrets: SecretMap) -> Self {
        Self {
            label: "memory".to_string(),
            secrets: RwLock::new(secrets),
            expected_client: None,
            authenticated: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            fail_next: AtomicU32::new(0),
            reject_auth: AtomicBool::new(false),
            delay: RwLock::new(Duration::ZERO),
            fetches: AtomicU64::new(0),
            auths: AtomicU64::new(0),
        }
    }

    /// Only accept credentials with this client id.
    pub fn expecting_client(mut self, client_id: impl Into<String>) -> Self {
        self.expected_client = Some(client_id.into());
        self
    }

    /// Replace the stored secrets (simulates rotation in the backend).
    pub fn set_secrets(&self, secrets: SecretMap) {
        *self.secrets.write() = secrets;
    }

    /// Make the next `count` fetches fail with a transport error.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Reject all authentication attempts until called with `false`.
    pub fn reject_auth(&self, reject: bool) {
        self.reject_auth.store(reject, Ordering::SeqCst);
    }

    /// Drop the session so the next fetch reports `NotAuthenticated`.
    pub fn expire_session(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Delay every fetch by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = delay;
    }

    /// Number of fetches attempted so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of authentication attempts so far.
    pub fn auth_count(&self) -> u64 {
        self.auths.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretSource for MemorySource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        self.auths.fetch_add(1, Ordering::SeqCst);

        let wrong_client = self
            .expected_client
            .as_deref()
            .is_some_and(|expected| expected != credentials.client_id);
        if self.reject_auth.load(Ordering::SeqCst) || wrong_client {
            self.authenticated.store(false, Ordering::SeqCst);
            return Err(AuthError::Rejected {
                source_label: self.label.clone(),
                reason: format!("unknown client {}", credentials.client_id),
            }
            .into());
        }

        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_all(&self) -> Result<SecretMap> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            trace!("injected fetch failure");
            return Err(TransportError::Unavailable("injected failure".to_string()).into());
        }

        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(AuthError::NotAuthenticated(self.label.clone()).into());
        }

        Ok(self.secrets.read().clone())
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
