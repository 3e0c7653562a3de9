//! Secret sources and credential providers.
//!
//! The orchestrator reaches the authoritative secret backend only through
//! the [`SecretSource`] trait, and obtains identity material only through
//! [`CredentialProvider`].
//!
//! ## Adding a New Source
//!
//! 1. Implement the `SecretSource` trait
//! 2. Add the implementation in a new file (e.g., `vault.rs`, `aws.rs`)
//! 3. Re-export from this module and wire it into [`from_config`]

mod credentials;
mod env;
mod file;
mod memory;

use async_trait::async_trait;

use crate::core::config::{SourceConfig, SourceKind};
use crate::core::types::SecretMap;
use crate::error::Result;

pub use credentials::{CredentialProvider, Credentials, EnvCredentials, StaticCredentials};
pub use env::EnvSource;
pub use file::FileSource;
pub use memory::MemorySource;

/// The authoritative secret backend.
///
/// Implementations must be cheap to share between tasks; the orchestrator
/// holds one behind an `Arc` and may call it from the background refresh
/// task and from callers concurrently.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Short label recorded in each snapshot (e.g. `file:/etc/app`).
    fn label(&self) -> &str;

    /// Establish a session using `credentials`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the credentials are missing or rejected.
    async fn authenticate(&self, credentials: &Credentials) -> Result<()>;

    /// Fetch the complete secret set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when the session is missing
    /// or has lapsed, and `TransportError` when the backend cannot be
    /// reached or answers with garbage.
    async fn fetch_all(&self) -> Result<SecretMap>;

    /// Cheap liveness check. Never errors.
    async fn health_check(&self) -> bool;
}

/// Build the source described by the configuration.
pub fn from_config(config: &SourceConfig) -> Box<dyn SecretSource> {
    match config.kind {
        SourceKind::File => Box::new(FileSource::from_config(config)),
        SourceKind::Env => Box::new(EnvSource::new(
            config.namespace.clone().unwrap_or_default(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = SourceConfig::default();
        assert!(from_config(&config).label().starts_with("file:"));

        config.kind = SourceKind::Env;
        config.namespace = Some("APP_".to_string());
        assert_eq!(from_config(&config).label(), "env:APP_");
    }
}
