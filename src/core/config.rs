//! Configuration file management.
//!
//! Handles reading and validating `.vaultcache.toml`. Every field has a
//! default, so an empty file (or no file at all, via [`Config::default`])
//! yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Top-level configuration stored in `.vaultcache.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where secrets come from
    pub source: SourceConfig,
    /// Snapshot cache and refresh behaviour
    pub cache: CacheConfig,
    /// Per-key TTL cache
    pub keyed: KeyedConfig,
}

/// Which secret source backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A TOML or JSON document on disk
    #[default]
    File,
    /// Process environment variables
    Env,
}

/// Secret source addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Base location of the source (a directory for `file`)
    pub address: String,
    /// Namespace within the source (a subdirectory, or an env prefix)
    pub namespace: Option<String>,
    /// Secret path within the namespace (a file stem for `file`)
    pub path: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::File,
            address: ".".to_string(),
            namespace: None,
            path: None,
        }
    }
}

/// Snapshot cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backing file. Defaults to `<cache dir>/vaultcache/cache.json`.
    pub file: Option<PathBuf>,
    pub ttl_secs: u64,
    pub refresh_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub mirror_name: String,
    pub mirror_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file: None,
            ttl_secs: constants::DEFAULT_TTL.as_secs(),
            refresh_interval_secs: constants::DEFAULT_REFRESH_INTERVAL.as_secs(),
            fetch_timeout_secs: constants::DEFAULT_FETCH_TIMEOUT.as_secs(),
            mirror_name: constants::MIRROR_NAME.to_string(),
            mirror_enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Resolve the backing file path.
    ///
    /// A leading `~/` is expanded to the home directory; with no file
    /// configured the user cache directory is used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the home or cache directory
    /// cannot be determined.
    pub fn cache_file(&self) -> Result<PathBuf> {
        match &self.file {
            Some(path) => expand_home(path),
            None => {
                let base = dirs::cache_dir().ok_or_else(|| ConfigError::InvalidValue {
                    field: "cache.file",
                    reason: "unable to determine cache directory".to_string(),
                })?;
                Ok(base.join(constants::CACHE_DIR).join(constants::CACHE_FILE))
            }
        }
    }
}

/// Keyed cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyedConfig {
    pub expiration_secs: u64,
    pub cleanup_interval_secs: u64,
    pub cleanup_enabled: bool,
}

impl Default for KeyedConfig {
    fn default() -> Self {
        Self {
            expiration_secs: constants::DEFAULT_KEYED_EXPIRATION.as_secs(),
            cleanup_interval_secs: constants::DEFAULT_CLEANUP_INTERVAL.as_secs(),
            cleanup_enabled: true,
        }
    }
}

impl KeyedConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Config {
    /// Path to the configuration file in the current directory
    pub fn config_path() -> PathBuf {
        PathBuf::from(constants::CONFIG_FILE)
    }

    /// Load configuration from `.vaultcache.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// See [`Config::load_from`].
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, apply environment
    /// overrides, and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist,
    /// `ConfigError::Parse` if the TOML is malformed, or a validation error.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;

        debug!(
            source = ?config.source.kind,
            refresh_secs = config.cache.refresh_interval_secs,
            ttl_secs = config.cache.ttl_secs,
            "config loaded"
        );
        Ok(config)
    }

    /// Parse configuration text without touching the environment.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents).map_err(ConfigError::Parse)?)
    }

    /// Apply `VAULTCACHE_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if an override does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(file) = std::env::var(constants::ENV_CACHE_FILE) {
            debug!(file = %file, "cache file overridden from environment");
            self.cache.file = Some(PathBuf::from(file));
        }
        if let Ok(secs) = std::env::var(constants::ENV_REFRESH_INTERVAL) {
            self.cache.refresh_interval_secs =
                secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "cache.refresh_interval_secs",
                    reason: format!("{} is not a number of seconds: {}", constants::ENV_REFRESH_INTERVAL, secs),
                })?;
        }
        Ok(())
    }

    /// Validate the configuration values
    ///
    /// Checks:
    /// - Source address is present
    /// - TTL, refresh interval and fetch timeout are non-zero
    /// - No interval or timeout exceeds `MAX_INTERVAL` (one year)
    /// - Keyed cleanup interval is non-zero when cleanup is enabled
    /// - Mirror name is a plain file name when the mirror is enabled
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` or `ConfigError::MissingField` on validation failure.
    pub fn validate(&self) -> Result<()> {
        debug!("validating config");

        if self.source.address.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "source.address",
            }
            .into());
        }

        for (field, value) in [
            ("cache.ttl_secs", self.cache.ttl_secs),
            ("cache.refresh_interval_secs", self.cache.refresh_interval_secs),
            ("cache.fetch_timeout_secs", self.cache.fetch_timeout_secs),
            ("keyed.expiration_secs", self.keyed.expiration_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".to_string(),
                }
                .into());
            }
        }

        let max_secs = constants::MAX_INTERVAL.as_secs();
        for (field, value) in [
            ("cache.ttl_secs", self.cache.ttl_secs),
            ("cache.refresh_interval_secs", self.cache.refresh_interval_secs),
            ("cache.fetch_timeout_secs", self.cache.fetch_timeout_secs),
            ("keyed.expiration_secs", self.keyed.expiration_secs),
            ("keyed.cleanup_interval_secs", self.keyed.cleanup_interval_secs),
        ] {
            if value > max_secs {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be at most {} seconds", max_secs),
                }
                .into());
            }
        }

        if self.keyed.cleanup_enabled && self.keyed.cleanup_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "keyed.cleanup_interval_secs",
                reason: "must be greater than zero when cleanup is enabled".to_string(),
            }
            .into());
        }

        if self.cache.mirror_enabled {
            let name = &self.cache.mirror_name;
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(ConfigError::InvalidValue {
                    field: "cache.mirror_name",
                    reason: format!("not a plain segment name: {:?}", name),
                }
                .into());
            }
        }

        Ok(())
    }
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or_else(|| ConfigError::InvalidValue {
                field: "cache.file",
                reason: "unable to determine home directory".to_string(),
            })?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}
