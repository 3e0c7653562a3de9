//! Constants used throughout vaultcache.
//!
//! Centralizes file names, environment variables and default intervals.

use std::time::Duration;

/// Configuration file name (.vaultcache.toml).
pub const CONFIG_FILE: &str = ".vaultcache.toml";

/// Cache file name inside the cache directory.
pub const CACHE_FILE: &str = "cache.json";

/// Directory under the user cache dir (~/.cache/vaultcache).
pub const CACHE_DIR: &str = "vaultcache";

/// Default name of the shared-memory mirror segment.
pub const MIRROR_NAME: &str = "vaultcache";

/// Smallest size of the shared-memory mirror segment (64 KiB).
pub const MIRROR_MIN_SIZE: usize = 64 * 1024;

/// Length prefix at the start of the mirror segment.
pub const MIRROR_HEADER_LEN: usize = 8;

/// Snapshot time-to-live when none is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Interval between background refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on a single fetch from the secret source.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default expiration for keyed cache entries.
pub const DEFAULT_KEYED_EXPIRATION: Duration = Duration::from_secs(5 * 60);

/// Default sweep interval for the keyed cache.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound for every configured interval and timeout. Keeps
/// `Instant` and timestamp arithmetic far from overflow.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Capacity of the notification broadcast channel.
pub const NOTIFICATION_CAPACITY: usize = 64;

/// Environment variable overriding the cache file path.
pub const ENV_CACHE_FILE: &str = "VAULTCACHE_CACHE_FILE";

/// Environment variable overriding the refresh interval (seconds).
pub const ENV_REFRESH_INTERVAL: &str = "VAULTCACHE_REFRESH_INTERVAL";

/// Environment variable holding the client id.
pub const ENV_CLIENT_ID: &str = "VAULTCACHE_CLIENT_ID";

/// Environment variable holding the client secret.
pub const ENV_CLIENT_SECRET: &str = "VAULTCACHE_CLIENT_SECRET";

/// Environment variable controlling the log filter.
pub const ENV_LOG: &str = "VAULTCACHE_LOG";
