//! Test support utilities for vaultcache integration tests.
//!
//! Provides isolated project directories, secrets documents and
//! helpers for building caches and running the binary.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;

use tempfile::TempDir;
use vaultcache::core::config::Config;
use vaultcache::core::types::SecretMap;

/// Test environment with an isolated project directory.
///
/// The directory holds `.vaultcache.toml`, a `secrets.toml` document for
/// the file source, and the cache file under `cache/`. Child processes
/// use `.current_dir()` so tests can safely run in parallel.
pub struct Test {
    pub dir: TempDir,
}

impl Test {
    /// Empty project directory with no config and no secrets.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    /// Project with a config file pointing at a file source.
    pub fn init() -> Self {
        let t = Self::new();
        t.write_config(BASE_CONFIG);
        t
    }

    /// Project with a config file and the given secrets document.
    pub fn with_secrets(secrets: &[(&str, &str)]) -> Self {
        let t = Self::init();
        t.write_secrets(secrets);
        t
    }

    pub fn write_config(&self, contents: &str) {
        std::fs::write(self.dir.path().join(".vaultcache.toml"), contents)
            .expect("failed to write config");
    }

    /// Replace `secrets.toml` with flat `KEY = "value"` pairs.
    pub fn write_secrets(&self, secrets: &[(&str, &str)]) {
        let doc: toml::Table = secrets
            .iter()
            .map(|(k, v)| (k.to_string(), toml::Value::String(v.to_string())))
            .collect();
        let contents = toml::to_string(&doc).expect("failed to encode secrets");
        std::fs::write(self.secrets_path(), contents).expect("failed to write secrets");
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.dir.path().join("secrets.toml")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.path().join("cache").join("cache.json")
    }

    /// In-process config equivalent to [`BASE_CONFIG`] with absolute paths.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.source.address = self.dir.path().display().to_string();
        config.cache.file = Some(self.cache_path());
        config.cache.mirror_enabled = false;
        config
    }
}

/// Build a [`SecretMap`] from pairs.
pub fn secrets(pairs: &[(&str, &str)]) -> SecretMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
