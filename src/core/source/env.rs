//! Environment-variable secret source.
//!
//! Every variable starting with the prefix becomes a secret, keyed by the
//! remainder of its name. An empty prefix takes the whole environment.

use async_trait::async_trait;
use tracing::debug;

use super::{Credentials, SecretSource};
use crate::core::types::SecretMap;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    label: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let label = format!("env:{}", prefix);
        Self { prefix, label }
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> SecretMap {
        vars.filter_map(|(name, value)| {
            name.strip_prefix(&self.prefix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest.to_string(), value))
        })
        .collect()
    }
}

#[async_trait]
impl SecretSource for EnvSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn authenticate(&self, _credentials: &Credentials) -> Result<()> {
        Ok(())
    }

    async fn fetch_all(&self) -> Result<SecretMap> {
        // Variables that are not valid UTF-8 cannot be secrets.
        let vars = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
        let secrets = self.collect(vars);
        debug!(prefix = %self.prefix, keys = secrets.len(), "collected environment secrets");
        Ok(secrets)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
