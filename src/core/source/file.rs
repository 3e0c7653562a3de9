//! File-backed secret source.
//!
//! Reads a TOML or JSON document from `address/namespace/path`. Nested
//! tables are flattened into `/`-separated keys, so
//!
//! ```toml
//! [database]
//! password = "hunter2"
//! ```
//!
//! yields the key `database/password`. Non-string scalars are stored in
//! their textual form.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{Credentials, SecretSource};
use crate::core::config::SourceConfig;
use crate::core::types::SecretMap;
use crate::error::{Result, TransportError};

const DEFAULT_STEM: &str = "secrets";

#[derive(Debug, Clone)]
pub struct FileSource {
    base: PathBuf,
    label: String,
}

impl FileSource {
    /// Source rooted at `base`: either a document, or a path without
    /// extension that resolves to `base.toml` or `base.json`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let label = format!("file:{}", base.display());
        Self { base, label }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        let mut base = PathBuf::from(&config.address);
        if let Some(namespace) = config.namespace.as_deref().filter(|n| !n.is_empty()) {
            base.push(namespace);
        }
        base.push(config.path.as_deref().unwrap_or(DEFAULT_STEM));
        Self::new(base)
    }

    /// The document that will be read, if one exists.
    pub fn resolve(&self) -> Option<PathBuf> {
        if self.base.is_file() {
            return Some(self.base.clone());
        }
        ["toml", "json"]
            .iter()
            .map(|ext| with_added_extension(&self.base, ext))
            .find(|p| p.is_file())
    }

    fn read(&self) -> Result<SecretMap> {
        let path = self.resolve().ok_or_else(|| {
            TransportError::Unavailable(format!("no secrets document at {}", self.base.display()))
        })?;
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            TransportError::Unavailable(format!("failed to read {}: {}", path.display(), e))
        })?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let value: serde_json::Value = if is_json {
            serde_json::from_str(&contents).map_err(|e| self.malformed(e))?
        } else {
            let table: toml::Table = toml::from_str(&contents).map_err(|e| self.malformed(e))?;
            serde_json::to_value(table).map_err(|e| self.malformed(e))?
        };

        let mut secrets = SecretMap::new();
        flatten("", &value, &mut secrets).map_err(|reason| self.malformed(reason))?;
        debug!(path = %path.display(), keys = secrets.len(), "read secrets document");
        Ok(secrets)
    }

    fn malformed(&self, reason: impl std::fmt::Display) -> TransportError {
        TransportError::Malformed {
            source_label: self.label.clone(),
            reason: reason.to_string(),
        }
    }
}

fn with_added_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut SecretMap) -> std::result::Result<(), String> {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}/{}", prefix, key)
                };
                flatten(&path, child, out)?;
            }
        }
        _ if prefix.is_empty() => return Err("top level must be a table".to_string()),
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Null => {
            trace!(key = %prefix, "skipping null value");
        }
        Value::Array(_) => return Err(format!("{}: arrays are not supported", prefix)),
    }
    Ok(())
}

#[async_trait]
impl SecretSource for FileSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn authenticate(&self, _credentials: &Credentials) -> Result<()> {
        // Access is governed by filesystem permissions.
        if self.resolve().is_none() {
            return Err(TransportError::Unavailable(format!(
                "no secrets document at {}",
                self.base.display()
            ))
            .into());
        }
        Ok(())
    }

    async fn fetch_all(&self) -> Result<SecretMap> {
        self.read()
    }

    async fn health_check(&self) -> bool {
        self.resolve().is_some()
    }
}
