//! Durable snapshot store.
//!
//! [`CacheStore`] holds exactly one [`CacheSnapshot`] behind a single mutex.
//! Every update is written to the backing file (temp + rename) and mirrored
//! into a shared-memory segment. Reads verify the snapshot digest and fall
//! back to reloading the file when the in-memory copy is missing, expired
//! or corrupt.
//!
//! ## Example
//!
//! ```no_run
//! use vaultcache::core::clock;
//! use vaultcache::core::config::CacheConfig;
//! use vaultcache::core::store::CacheStore;
//! use vaultcache::core::types::SecretMap;
//!
//! let store = CacheStore::open(&CacheConfig::default(), clock::system())?;
//! let mut secrets = SecretMap::new();
//! secrets.insert("API_KEY".into(), "sk-123".into());
//! store.update(secrets, "memory")?;
//! assert!(store.get().is_some());
//! # Ok::<(), vaultcache::error::Error>(())
//! ```

mod file;
mod mirror;

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::core::clock::SharedClock;
use crate::core::config::CacheConfig;
use crate::core::snapshot::CacheSnapshot;
use crate::core::types::{SecretMap, Version};
use crate::error::{PersistenceError, Result};

pub use file::SnapshotFile;
pub use mirror::{segment_size, SharedMirror};

/// Whether the store currently has servable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// No snapshot loaded
    Empty,
    /// Snapshot within its TTL
    Valid,
    /// Snapshot present but past `expires_at`
    Expired,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheStatus::Empty => write!(f, "empty"),
            CacheStatus::Valid => write!(f, "valid"),
            CacheStatus::Expired => write!(f, "expired"),
        }
    }
}

/// Read-only view of the store for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatistics {
    pub status: CacheStatus,
    pub version: Version,
    pub source: Option<String>,
    pub key_count: usize,
    pub access_count: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub data_hash: Option<String>,
    pub cache_file: PathBuf,
    pub updates: u64,
    pub reloads: u64,
    pub integrity_failures: u64,
    pub persist_failures: u64,
}

/// Result of a successful [`CacheStore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub version: Version,
    /// `false` if the backing file could not be written. Readers in this
    /// process still see the new data.
    pub persisted: bool,
}

#[derive(Default)]
struct Inner {
    snapshot: Option<CacheSnapshot>,
    /// Highest version ever held, so versions stay monotonic across clears
    last_version: Version,
    updates: u64,
    reloads: u64,
    integrity_failures: u64,
    persist_failures: u64,
}

/// Process-wide holder of the current secret snapshot.
///
/// Construct one per process and share it behind an `Arc`.
pub struct CacheStore {
    inner: Mutex<Inner>,
    file: SnapshotFile,
    mirror: Option<SharedMirror>,
    ttl: Duration,
    clock: SharedClock,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("file", &self.file.path())
            .field("mirror", &self.mirror.as_ref().map(|m| m.path()))
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CacheStore {
    /// Open the store described by `config`, loading any valid snapshot
    /// already on disk.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the cache file path cannot be resolved.
    /// A missing or corrupt cache file is not an error.
    pub fn open(config: &CacheConfig, clock: SharedClock) -> Result<Self> {
        let mirror = config
            .mirror_enabled
            .then(|| SharedMirror::named(&config.mirror_name));
        Ok(Self::with_parts(
            SnapshotFile::new(config.cache_file()?),
            mirror,
            config.ttl(),
            clock,
        ))
    }

    /// Build a store from explicit parts.
    pub fn with_parts(
        file: SnapshotFile,
        mirror: Option<SharedMirror>,
        ttl: Duration,
        clock: SharedClock,
    ) -> Self {
        let store = Self {
            inner: Mutex::new(Inner::default()),
            file,
            mirror,
            ttl,
            clock,
        };
        {
            let now = store.clock.now();
            let mut inner = store.inner.lock();
            store.reload_locked(&mut inner, now);
        }
        store
    }

    /// Configured snapshot TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current time on the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Path of the backing file.
    pub fn cache_file(&self) -> &std::path::Path {
        self.file.path()
    }

    /// Current secret set, if a valid snapshot is available.
    ///
    /// Missing, expired or corrupt in-memory state triggers a reload from
    /// the backing file. A hit counts as an access and republishes the
    /// shared-memory mirror.
    pub fn get(&self) -> Option<SecretMap> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        if !self.servable_locked(&mut inner, now) {
            self.reload_locked(&mut inner, now);
        }

        let snapshot = inner.snapshot.as_mut().filter(|s| s.is_fresh(now))?;
        snapshot.touch(now);
        let data = snapshot.data.clone();
        self.publish(snapshot);
        Some(data)
    }

    /// Look up a single key in the current snapshot.
    ///
    /// Same reload and access semantics as [`CacheStore::get`].
    pub fn get_value(&self, key: &str) -> Option<Option<String>> {
        self.get().map(|data| data.get(key).cloned())
    }

    /// Replace the snapshot using the configured TTL.
    ///
    /// # Errors
    ///
    /// See [`CacheStore::update_with_ttl`].
    pub fn update(&self, data: SecretMap, source: &str) -> Result<UpdateOutcome> {
        self.update_with_ttl(data, source, self.ttl)
    }

    /// Replace the snapshot with `data`, valid for `ttl`.
    ///
    /// The file write happens under the lock so versions hit the disk in
    /// order. A failed write is logged and reported in the outcome; the
    /// in-memory snapshot is replaced regardless.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Serialize` only if the data cannot be
    /// serialized at all, in which case nothing changes.
    pub fn update_with_ttl(
        &self,
        data: SecretMap,
        source: &str,
        ttl: Duration,
    ) -> Result<UpdateOutcome> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let version = inner.last_version + 1;
        let snapshot = CacheSnapshot::new(data, version, source, now, ttl)
            .map_err(PersistenceError::Serialize)?;

        let persisted = match self.file.save(&snapshot) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, version, "cache file write failed, serving from memory");
                inner.persist_failures += 1;
                false
            }
        };
        self.publish(&snapshot);

        info!(
            version,
            keys = snapshot.data.len(),
            source = %snapshot.source,
            expires_at = %snapshot.expires_at,
            "cache updated"
        );

        if let Some(mut old) = inner.snapshot.replace(snapshot) {
            scrub(&mut old);
        }
        inner.last_version = version;
        inner.updates += 1;

        Ok(UpdateOutcome { version, persisted })
    }

    /// Whether a snapshot is present and within its TTL.
    ///
    /// Does not touch the disk.
    pub fn is_valid(&self) -> bool {
        let now = self.clock.now();
        self.inner
            .lock()
            .snapshot
            .as_ref()
            .is_some_and(|s| s.is_fresh(now))
    }

    /// Version of the held snapshot, `0` when empty.
    pub fn version(&self) -> Version {
        self.inner.lock().snapshot.as_ref().map_or(0, |s| s.version)
    }

    /// Drop the snapshot, delete the backing file and zero the mirror.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Remove` if the backing file exists but
    /// cannot be deleted. Mirror failures are only logged.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(mut old) = inner.snapshot.take() {
            scrub(&mut old);
        }

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.zero() {
                warn!(error = %e, "failed to zero shared-memory mirror");
            }
        }
        self.file.remove()?;

        info!(path = %self.file.path().display(), "cache cleared");
        Ok(())
    }

    /// Snapshot of the store's status and counters.
    pub fn statistics(&self) -> CacheStatistics {
        let now = self.clock.now();
        let inner = self.inner.lock();
        let snapshot = inner.snapshot.as_ref();

        let status = match snapshot {
            None => CacheStatus::Empty,
            Some(s) if s.is_fresh(now) => CacheStatus::Valid,
            Some(_) => CacheStatus::Expired,
        };

        CacheStatistics {
            status,
            version: snapshot.map_or(0, |s| s.version),
            source: snapshot.map(|s| s.source.clone()),
            key_count: snapshot.map_or(0, |s| s.data.len()),
            access_count: snapshot.map_or(0, |s| s.access_count),
            created_at: snapshot.map(|s| s.created_at),
            expires_at: snapshot.map(|s| s.expires_at),
            last_accessed_at: snapshot.map(|s| s.last_accessed_at),
            data_hash: snapshot.map(|s| s.data_hash.clone()),
            cache_file: self.file.path().to_path_buf(),
            updates: inner.updates,
            reloads: inner.reloads,
            integrity_failures: inner.integrity_failures,
            persist_failures: inner.persist_failures,
        }
    }

    /// Fresh and intact. A corrupt in-memory snapshot is dropped here.
    fn servable_locked(&self, inner: &mut Inner, now: DateTime<Utc>) -> bool {
        let Some(snapshot) = inner.snapshot.as_ref() else {
            return false;
        };
        if let Err(e) = snapshot.verify() {
            warn!(error = %e, version = snapshot.version, "in-memory snapshot failed verification");
            inner.integrity_failures += 1;
            inner.snapshot = None;
            return false;
        }
        snapshot.is_fresh(now)
    }

    /// Try to replace the in-memory snapshot with a fresh one from disk.
    fn reload_locked(&self, inner: &mut Inner, now: DateTime<Utc>) {
        inner.reloads += 1;
        match self.file.load() {
            Ok(Some(snapshot)) if snapshot.is_fresh(now) => {
                debug!(version = snapshot.version, "reloaded snapshot from disk");
                inner.last_version = inner.last_version.max(snapshot.version);
                inner.snapshot = Some(snapshot);
            }
            Ok(Some(snapshot)) => {
                debug!(
                    version = snapshot.version,
                    expires_at = %snapshot.expires_at,
                    "snapshot on disk is expired"
                );
                inner.last_version = inner.last_version.max(snapshot.version);
                if inner.snapshot.is_none() {
                    inner.snapshot = Some(snapshot);
                }
            }
            Ok(None) => {}
            Err(crate::error::Error::Integrity(e)) => {
                warn!(error = %e, path = %self.file.path().display(), "discarding corrupt cache file");
                inner.integrity_failures += 1;
            }
            Err(e) => {
                warn!(error = %e, path = %self.file.path().display(), "failed to read cache file");
            }
        }
    }

    fn publish(&self, snapshot: &CacheSnapshot) {
        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.publish(snapshot) {
                debug!(error = %e, "shared-memory mirror update failed");
            }
        }
    }
}

/// Overwrite secret values before a snapshot is dropped.
fn scrub(snapshot: &mut CacheSnapshot) {
    for value in snapshot.data.values_mut() {
        value.zeroize();
    }
}
