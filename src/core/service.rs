//! Application-scoped owner of the caching components.
//!
//! A host builds one [`SecretCache`] at startup and hands out the store,
//! orchestrator and keyed cache by shared handle. Nothing here is global;
//! two `SecretCache`s in one process would simply be two caches.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::clock::SharedClock;
use crate::core::config::Config;
use crate::core::keyed::KeyedCache;
use crate::core::orchestrator::RefreshOrchestrator;
use crate::core::source::{CredentialProvider, SecretSource};
use crate::core::store::CacheStore;
use crate::error::Result;

/// Keyed cache of ad hoc string values.
pub type ValueCache = KeyedCache<String>;

pub struct SecretCache {
    orchestrator: Arc<RefreshOrchestrator>,
    keyed: Arc<ValueCache>,
    shutdown: broadcast::Sender<()>,
    cleanup: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SecretCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCache")
            .field("orchestrator", &self.orchestrator)
            .field("keyed", &self.keyed)
            .finish()
    }
}

impl SecretCache {
    /// Build every component from `config` without contacting the source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the cache file path cannot be resolved.
    pub fn build(
        config: &Config,
        source: Arc<dyn SecretSource>,
        credentials: Arc<dyn CredentialProvider>,
        clock: SharedClock,
    ) -> Result<Self> {
        let store = Arc::new(CacheStore::open(&config.cache, clock.clone())?);
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            store,
            source,
            credentials,
            &config.cache,
        ));
        let keyed = Arc::new(KeyedCache::new(&config.keyed, clock));
        let (shutdown, _) = broadcast::channel(1);

        Ok(Self {
            orchestrator,
            keyed,
            shutdown,
            cleanup: None,
        })
    }

    /// Build, initialize the orchestrator and start background tasks.
    ///
    /// # Errors
    ///
    /// Returns any error from [`SecretCache::build`] or
    /// [`RefreshOrchestrator::initialize`].
    pub async fn start(
        config: &Config,
        source: Arc<dyn SecretSource>,
        credentials: Arc<dyn CredentialProvider>,
        clock: SharedClock,
    ) -> Result<Self> {
        let mut cache = Self::build(config, source, credentials, clock)?;
        cache.orchestrator.initialize().await?;
        cache.cleanup = cache.keyed.spawn_cleanup(cache.shutdown.subscribe());
        info!("secret cache started");
        Ok(cache)
    }

    pub fn orchestrator(&self) -> &Arc<RefreshOrchestrator> {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        self.orchestrator.store()
    }

    pub fn keyed(&self) -> &Arc<ValueCache> {
        &self.keyed
    }

    /// Stop background tasks and close the orchestrator.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.cleanup.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "keyed cleanup task ended abnormally");
            }
        }
        self.orchestrator.shutdown().await;
        info!("secret cache stopped");
    }
}
