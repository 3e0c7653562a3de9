//! Per-key TTL cache.
//!
//! [`KeyedCache`] is independent from the snapshot store: it holds ad hoc
//! values, each with its own lifetime, under case-insensitive keys.
//! Expired entries are dropped lazily when read and in bulk by
//! [`KeyedCache::cleanup_expired_items`], which can run on a background
//! task via [`KeyedCache::spawn_cleanup`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::core::clock::{self, SharedClock};
use crate::core::config::KeyedConfig;
use crate::core::constants;
use crate::error::{Result, ValidationError};

/// A cached value and its lifetime.
#[derive(Debug)]
pub struct CacheItem<V> {
    value: V,
    created: DateTime<Utc>,
    /// Unix millis; atomic so reads can update it under a shared lock
    last_accessed: AtomicI64,
    ttl: Duration,
}

impl<V> CacheItem<V> {
    fn new(value: V, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            created: now,
            last_accessed: AtomicI64::new(now.timestamp_millis()),
            ttl,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        clock::add(self.created, self.ttl)
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_accessed.load(Ordering::Relaxed))
            .unwrap_or(self.created)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.last_accessed
            .store(now.timestamp_millis(), Ordering::Relaxed);
    }
}

/// Counters exposed by [`KeyedCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyedCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because a read found them expired
    pub expired_on_read: u64,
    /// Entries dropped by the periodic sweep
    pub swept: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_on_read: AtomicU64,
    swept: AtomicU64,
}

/// Thread-safe map of per-key TTL entries.
///
/// Reads share a read lock; `set`, `remove`, `clear` and the removal
/// phase of a sweep take the write lock.
pub struct KeyedCache<V> {
    items: RwLock<HashMap<String, CacheItem<V>>>,
    default_ttl: Duration,
    cleanup_interval: Duration,
    cleanup_enabled: bool,
    clock: SharedClock,
    counters: Counters,
}

impl<V> std::fmt::Debug for KeyedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCache")
            .field("entries", &self.items.read().len())
            .field("default_ttl", &self.default_ttl)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("cleanup_enabled", &self.cleanup_enabled)
            .finish()
    }
}

fn normalize(key: &str) -> String {
    key.to_lowercase()
}

impl<V: Clone + Send + Sync + 'static> KeyedCache<V> {
    pub fn new(config: &KeyedConfig, clock: SharedClock) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            default_ttl: config.expiration(),
            cleanup_interval: config.cleanup_interval(),
            cleanup_enabled: config.cleanup_enabled,
            clock,
            counters: Counters::default(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up `key`, ignoring case.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn try_get(&self, key: &str) -> Option<V> {
        let key = normalize(key);
        let now = self.clock.now();

        {
            let items = self.items.read();
            match items.get(&key) {
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some(item) if !item.is_expired(now) => {
                    item.touch(now);
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(item.value.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: re-check under an upgradable read, a concurrent set may
        // have replaced it in between. Plain readers are not blocked until
        // the upgrade.
        let items = self.items.upgradable_read();
        if items.get(&key).is_some_and(|item| item.is_expired(now)) {
            let mut items = RwLockUpgradableReadGuard::upgrade(items);
            items.remove(&key);
            self.counters.expired_on_read.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "expired entry removed on read");
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace `key` with the default TTL.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyKey` for an empty key.
    pub fn set(&self, key: &str, value: V) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    /// Insert or replace `key` with an explicit TTL.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyKey` for an empty key and
    /// `ValidationError::ZeroTtl` for a zero TTL.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) -> Result<()> {
        if key.is_empty() {
            return Err(ValidationError::EmptyKey.into());
        }
        if ttl.is_zero() {
            return Err(ValidationError::ZeroTtl.into());
        }

        let now = self.clock.now();
        self.items
            .write()
            .insert(normalize(key), CacheItem::new(value, now, ttl));
        trace!(key = %key, ttl_ms = ttl.as_millis() as u64, "keyed entry set");
        Ok(())
    }

    /// Remove `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.items.write().remove(&normalize(key)).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut items = self.items.write();
        let count = items.len();
        items.clear();
        debug!(removed = count, "keyed cache cleared");
    }

    /// Number of entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Remove every expired entry and return how many were removed.
    ///
    /// Expired keys are collected under the read lock first; the write
    /// lock is held only to delete them.
    pub fn cleanup_expired_items(&self) -> usize {
        let now = self.clock.now();

        let expired: Vec<String> = {
            let items = self.items.read();
            items
                .iter()
                .filter(|(_, item)| item.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect()
        };
        if expired.is_empty() {
            return 0;
        }

        let mut items = self.items.write();
        let mut removed = 0;
        for key in expired {
            // Skip entries refreshed between the two phases.
            if items.get(&key).is_some_and(|item| item.is_expired(now)) {
                items.remove(&key);
                removed += 1;
            }
        }
        drop(items);

        self.counters
            .swept
            .fetch_add(removed as u64, Ordering::Relaxed);
        debug!(removed, "expired keyed entries swept");
        removed
    }

    pub fn stats(&self) -> KeyedCacheStats {
        KeyedCacheStats {
            entries: self.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired_on_read: self.counters.expired_on_read.load(Ordering::Relaxed),
            swept: self.counters.swept.load(Ordering::Relaxed),
        }
    }

    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// Returns `None` when cleanup is disabled. The task exits when
    /// `shutdown` fires or its sender is dropped.
    pub fn spawn_cleanup(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        if !self.cleanup_enabled {
            debug!("keyed cache cleanup disabled");
            return None;
        }

        let cache = Arc::clone(self);
        let period = self.cleanup_interval.min(constants::MAX_INTERVAL);
        Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = period.as_secs(), "keyed cache cleanup started");

            loop {
                tokio::select! {
                    result = shutdown.recv() => {
                        match result {
                            Ok(()) | Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(_)) => {}
                        }
                    }
                    _ = ticker.tick() => {
                        cache.cleanup_expired_items();
                    }
                }
            }

            info!("keyed cache cleanup stopped");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::{Clock, ManualClock};

    fn cache() -> (ManualClock, KeyedCache<String>) {
        let clock = ManualClock::new();
        let config = KeyedConfig {
            expiration_secs: 60,
            cleanup_interval_secs: 1,
            cleanup_enabled: true,
        };
        let cache = KeyedCache::new(&config, Arc::new(clock.clone()));
        (clock, cache)
    }

    #[test]
    fn test_set_then_get() {
        let (_clock, cache) = cache();
        cache.set("token", "abc".to_string()).unwrap();
        assert_eq!(cache.try_get("token"), Some("abc".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let (_clock, cache) = cache();
        cache.set("Key", "v".to_string()).unwrap();
        assert_eq!(cache.try_get("key"), Some("v".to_string()));
        assert_eq!(cache.try_get("KEY"), Some("v".to_string()));

        cache.set("KEY", "w".to_string()).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.try_get("kEy"), Some("w".to_string()));

        assert!(cache.remove("kEY"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_read_removes_entry() {
        let (clock, cache) = cache();
        cache
            .set_with_ttl("short", "v".to_string(), Duration::from_secs(5))
            .unwrap();
        cache.set("long", "v".to_string()).unwrap();

        clock.advance(Duration::from_secs(5));

        assert_eq!(cache.try_get("short"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expired_on_read, 1);
    }

    #[test]
    fn test_rejects_empty_key_and_zero_ttl() {
        let (_clock, cache) = cache();
        assert!(matches!(
            cache.set("", "v".to_string()),
            Err(crate::error::Error::Validation(ValidationError::EmptyKey))
        ));
        assert!(matches!(
            cache.set_with_ttl("k", "v".to_string(), Duration::ZERO),
            Err(crate::error::Error::Validation(ValidationError::ZeroTtl))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_miss_is_not_an_error() {
        let (_clock, cache) = cache();
        assert_eq!(cache.try_get("nothing"), None);
        assert_eq!(cache.stats().misses, 1);
        assert!(!cache.remove("nothing"));
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let (clock, cache) = cache();
        for i in 0..10 {
            let ttl = if i < 4 { 10 } else { 120 };
            cache
                .set_with_ttl(&format!("k{}", i), i.to_string(), Duration::from_secs(ttl))
                .unwrap();
        }

        clock.advance(Duration::from_secs(30));

        assert_eq!(cache.cleanup_expired_items(), 4);
        assert_eq!(cache.len(), 6);
        assert_eq!(cache.cleanup_expired_items(), 0);
        assert_eq!(cache.stats().swept, 4);
    }

    #[test]
    fn test_replacing_entry_resets_lifetime() {
        let (clock, cache) = cache();
        cache
            .set_with_ttl("k", "old".to_string(), Duration::from_secs(10))
            .unwrap();
        clock.advance(Duration::from_secs(8));
        cache
            .set_with_ttl("k", "new".to_string(), Duration::from_secs(10))
            .unwrap();
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.try_get("k"), Some("new".to_string()));
    }

    #[test]
    fn test_clear() {
        let (_clock, cache) = cache();
        cache.set("a", "1".to_string()).unwrap();
        cache.set("b", "2".to_string()).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_read_updates_last_accessed() {
        let (clock, cache) = cache();
        cache.set("k", "v".to_string()).unwrap();
        clock.advance(Duration::from_secs(3));
        cache.try_get("k");

        let items = cache.items.read();
        let item = items.get("k").unwrap();
        assert_eq!(
            item.last_accessed().timestamp_millis(),
            clock.now().timestamp_millis()
        );
        assert!(item.created() < item.last_accessed());
    }

    #[tokio::test]
    async fn test_spawn_cleanup_disabled() {
        let config = KeyedConfig {
            cleanup_enabled: false,
            ..KeyedConfig::default()
        };
        let cache: Arc<KeyedCache<String>> =
            Arc::new(KeyedCache::new(&config, clock::system()));
        let (_tx, rx) = broadcast::channel(1);
        assert!(cache.spawn_cleanup(rx).is_none());
    }

    #[tokio::test]
    async fn test_spawn_cleanup_sweeps_and_stops() {
        let clock = ManualClock::new();
        let config = KeyedConfig {
            expiration_secs: 1,
            cleanup_interval_secs: 1,
            cleanup_enabled: true,
        };
        let cache = Arc::new(KeyedCache::new(&config, Arc::new(clock.clone())));
        cache.set("k", "v".to_string()).unwrap();
        clock.advance(Duration::from_secs(2));

        let (tx, rx) = broadcast::channel(1);
        let handle = cache.spawn_cleanup(rx).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !cache.is_empty() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(cache.is_empty());

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_spawn_cleanup_with_huge_interval_runs_until_shutdown() {
        let config = KeyedConfig {
            cleanup_interval_secs: u64::MAX,
            ..KeyedConfig::default()
        };
        let cache: Arc<KeyedCache<String>> =
            Arc::new(KeyedCache::new(&config, clock::system()));
        let (tx, rx) = broadcast::channel(1);
        let handle = cache.spawn_cleanup(rx).unwrap();

        tokio::task::yield_now().await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
