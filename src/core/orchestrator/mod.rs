//! Refresh orchestration.
//!
//! [`RefreshOrchestrator`] is the only component that talks to the secret
//! source. It authenticates, keeps the [`CacheStore`] populated on a fixed
//! interval, and serves reads from the store, falling back to a
//! synchronous refresh only when the cached snapshot is no longer valid.
//!
//! Refreshes are single-flighted: at most one fetch runs at a time. A
//! caller that had to wait while another refresh landed a new snapshot
//! returns that snapshot's version instead of fetching again, and the
//! periodic task skips its tick if a refresh is already running.

mod notify;
mod state;

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::config::CacheConfig;
use crate::core::constants;
use crate::core::source::{CredentialProvider, SecretSource};
use crate::core::store::{CacheStatistics, CacheStore};
use crate::core::types::{SecretMap, Version};
use crate::error::{AuthError, Error, Result, StateError, TransportError};

pub use notify::Notification;
pub use state::OrchestratorState;

/// Refresh outcome counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStats {
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub skipped_ticks: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Everything an administrative surface needs to report.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatistics {
    pub state: OrchestratorState,
    pub source: String,
    pub refresh_interval_secs: u64,
    pub refresh: RefreshStats,
    pub cache: CacheStatistics,
}

pub struct RefreshOrchestrator {
    store: Arc<CacheStore>,
    source: Arc<dyn SecretSource>,
    credentials: Arc<dyn CredentialProvider>,
    refresh_interval: Duration,
    fetch_timeout: Duration,
    state: RwLock<OrchestratorState>,
    events: broadcast::Sender<Notification>,
    shutdown: broadcast::Sender<()>,
    refresh_lock: tokio::sync::Mutex<()>,
    stats: Mutex<RefreshStats>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RefreshOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshOrchestrator")
            .field("source", &self.source.label())
            .field("state", &*self.state.read())
            .field("refresh_interval", &self.refresh_interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

impl RefreshOrchestrator {
    pub fn new(
        store: Arc<CacheStore>,
        source: Arc<dyn SecretSource>,
        credentials: Arc<dyn CredentialProvider>,
        config: &CacheConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(constants::NOTIFICATION_CAPACITY);
        let (shutdown, _) = broadcast::channel(1);
        Self {
            store,
            source,
            credentials,
            refresh_interval: config.refresh_interval(),
            fetch_timeout: config.fetch_timeout(),
            state: RwLock::new(OrchestratorState::Uninitialized),
            events,
            shutdown,
            refresh_lock: tokio::sync::Mutex::new(()),
            stats: Mutex::new(RefreshStats::default()),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.read()
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Receive notifications emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    /// Authenticate, make sure a valid snapshot is available, and start the
    /// periodic refresh task.
    ///
    /// A valid snapshot already held by the store (or reloaded from its
    /// file) is reused without fetching. Calling this again once running is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if authentication fails, or the refresh error if
    /// there was no usable snapshot and the initial fetch failed. The state
    /// returns to `Uninitialized` so the caller may retry.
    pub async fn initialize(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.write();
            match *state {
                OrchestratorState::Closed => return Err(StateError::Closed.into()),
                OrchestratorState::Initializing => {
                    return Err(StateError::AlreadyInitializing.into())
                }
                s if s.is_running() => return Ok(()),
                _ => *state = OrchestratorState::Initializing,
            }
        }
        self.notify_state(OrchestratorState::Uninitialized, OrchestratorState::Initializing);
        info!(source = %self.source.label(), "initializing");

        if let Err(e) = self.authenticate().await {
            warn!(error = %e, "authentication failed");
            self.transition(|_| Some(OrchestratorState::Uninitialized));
            return Err(e);
        }

        if let Some(data) = self.store.get() {
            info!(
                version = self.store.version(),
                keys = data.len(),
                "reusing cached snapshot"
            );
            self.transition(|s| {
                (s == OrchestratorState::Initializing).then_some(OrchestratorState::Ready)
            });
        } else if let Err(e) = self.refresh().await {
            self.transition(|s| {
                (s == OrchestratorState::Initializing).then_some(OrchestratorState::Uninitialized)
            });
            return Err(e);
        }

        self.start_refresh_task();
        Ok(())
    }

    /// Value of `key` from the current snapshot.
    ///
    /// A valid snapshot is authoritative: a key it does not contain is
    /// `Ok(None)` and the source is not consulted. Only an invalid snapshot
    /// triggers a synchronous refresh.
    ///
    /// # Errors
    ///
    /// Returns `StateError` before initialization or after shutdown, and
    /// the refresh error if the snapshot was invalid and could not be
    /// refreshed.
    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.ensure_running()?;
        if let Some(value) = self.store.get_value(key) {
            return Ok(value);
        }

        debug!(key = %key, "cache invalid, refreshing before read");
        self.refresh().await?;
        Ok(self.read_after_refresh()?.remove(key))
    }

    /// The full secret set. Same validity rules as [`get_value`](Self::get_value).
    ///
    /// # Errors
    ///
    /// See [`get_value`](Self::get_value).
    pub async fn get_all(&self) -> Result<SecretMap> {
        self.ensure_running()?;
        if let Some(data) = self.store.get() {
            return Ok(data);
        }

        debug!("cache invalid, refreshing before read");
        self.refresh().await?;
        self.read_after_refresh()
    }

    /// Fetch the full secret set and replace the snapshot.
    ///
    /// On failure the existing snapshot is left untouched and a
    /// `RefreshFailed` notification is emitted. Returns the version of the
    /// snapshot now held.
    ///
    /// # Errors
    ///
    /// Returns `StateError` before initialization or after shutdown, and
    /// `AuthError` / `TransportError` from the source.
    pub async fn refresh(&self) -> Result<Version> {
        match self.state() {
            OrchestratorState::Closed => return Err(StateError::Closed.into()),
            OrchestratorState::Uninitialized => return Err(StateError::NotInitialized.into()),
            _ => {}
        }

        let observed = self.store.version();
        let _guard = self.refresh_lock.lock().await;

        let current = self.store.version();
        if current > observed && self.store.is_valid() {
            debug!(version = current, "refresh satisfied by concurrent refresh");
            return Ok(current);
        }

        self.run_refresh().await
    }

    /// Whether callers can currently be served: either the cache is valid
    /// or the source reports itself healthy.
    pub async fn is_available(&self) -> bool {
        self.store.is_valid() || self.source.health_check().await
    }

    pub fn statistics(&self) -> OrchestratorStatistics {
        OrchestratorStatistics {
            state: self.state(),
            source: self.source.label().to_string(),
            refresh_interval_secs: self.refresh_interval.as_secs(),
            refresh: self.stats.lock().clone(),
            cache: self.store.statistics(),
        }
    }

    /// Stop the periodic task and close the orchestrator.
    ///
    /// The store keeps its snapshot; only this orchestrator stops serving.
    pub async fn shutdown(&self) {
        self.transition(|s| (s != OrchestratorState::Closed).then_some(OrchestratorState::Closed));
        let _ = self.shutdown.send(());

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "refresh task ended abnormally");
            }
        }
        info!("orchestrator closed");
    }

    async fn authenticate(&self) -> Result<()> {
        let credentials = self.credentials.credentials()?;
        timeout(self.fetch_timeout, self.source.authenticate(&credentials))
            .await
            .map_err(|_| TransportError::Timeout(self.fetch_timeout))??;
        debug!(client_id = %credentials.client_id, "authenticated");
        Ok(())
    }

    async fn fetch(&self) -> Result<SecretMap> {
        match self.fetch_once().await {
            Err(Error::Auth(AuthError::NotAuthenticated(_))) => {
                info!("session lapsed, re-authenticating");
                self.authenticate().await?;
                self.fetch_once().await
            }
            other => other,
        }
    }

    async fn fetch_once(&self) -> Result<SecretMap> {
        timeout(self.fetch_timeout, self.source.fetch_all())
            .await
            .map_err(|_| TransportError::Timeout(self.fetch_timeout))?
    }

    /// Fetch and store. Caller must hold `refresh_lock`.
    async fn run_refresh(&self) -> Result<Version> {
        self.transition(|s| {
            matches!(s, OrchestratorState::Ready | OrchestratorState::Degraded)
                .then_some(OrchestratorState::Refreshing)
        });

        let result = match self.fetch().await {
            Ok(data) => self
                .store
                .update(data.clone(), self.source.label())
                .map(|outcome| (outcome.version, data)),
            Err(e) => Err(e),
        };

        match result {
            Ok((version, data)) => {
                {
                    let mut stats = self.stats.lock();
                    stats.successes += 1;
                    stats.consecutive_failures = 0;
                    stats.last_success_at = Some(self.store.now());
                    stats.last_error = None;
                }
                self.transition(|s| {
                    (s != OrchestratorState::Closed).then_some(OrchestratorState::Ready)
                });
                self.emit(Notification::Updated { version, data });
                Ok(version)
            }
            Err(e) => {
                let consecutive_failures = {
                    let mut stats = self.stats.lock();
                    stats.failures += 1;
                    stats.consecutive_failures = stats.consecutive_failures.saturating_add(1);
                    stats.last_failure_at = Some(self.store.now());
                    stats.last_error = Some(e.to_string());
                    stats.consecutive_failures
                };
                warn!(
                    error = %e,
                    consecutive_failures,
                    transient = e.is_transient(),
                    cache_valid = self.store.is_valid(),
                    "refresh failed"
                );
                self.transition(|s| match s {
                    OrchestratorState::Refreshing
                    | OrchestratorState::Ready
                    | OrchestratorState::Degraded => Some(OrchestratorState::Degraded),
                    _ => None,
                });
                self.emit(Notification::RefreshFailed {
                    error: e.to_string(),
                    consecutive_failures,
                });
                Err(e)
            }
        }
    }

    fn read_after_refresh(&self) -> Result<SecretMap> {
        self.store
            .get()
            .ok_or_else(|| Error::Other("snapshot not valid after refresh".to_string()))
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state() {
            OrchestratorState::Closed => Err(StateError::Closed.into()),
            s if s.is_running() => Ok(()),
            _ => Err(StateError::NotInitialized.into()),
        }
    }

    /// Spawn the periodic refresh task unless one is already running.
    fn start_refresh_task(self: &Arc<Self>) {
        let mut slot = self.task.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let mut shutdown = self.shutdown.subscribe();
        let period = self.refresh_interval.min(constants::MAX_INTERVAL);

        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = period.as_secs(), "periodic refresh started");

            loop {
                tokio::select! {
                    result = shutdown.recv() => {
                        match result {
                            Ok(()) | Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(_)) => {}
                        }
                    }
                    _ = ticker.tick() => {
                        let Some(this) = weak.upgrade() else { break };
                        this.periodic_refresh().await;
                    }
                }
            }

            info!("periodic refresh stopped");
        }));
    }

    async fn periodic_refresh(&self) {
        if !self.state().is_running() {
            return;
        }
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            debug!("refresh already in progress, skipping tick");
            self.stats.lock().skipped_ticks += 1;
            return;
        };
        // Failures are reported through notifications.
        let _ = self.run_refresh().await;
    }

    fn transition(&self, next: impl FnOnce(OrchestratorState) -> Option<OrchestratorState>) {
        let change = {
            let mut state = self.state.write();
            let from = *state;
            match next(from) {
                Some(to) if to != from => {
                    *state = to;
                    Some((from, to))
                }
                _ => None,
            }
        };
        if let Some((from, to)) = change {
            self.notify_state(from, to);
        }
    }

    fn notify_state(&self, from: OrchestratorState, to: OrchestratorState) {
        debug!(%from, %to, "state changed");
        self.emit(Notification::StateChanged { from, to });
    }

    fn emit(&self, notification: Notification) {
        debug!(kind = notification.kind(), "notify");
        // No subscribers is fine.
        let _ = self.events.send(notification);
    }
}
