//! Client identity material for authenticating to a secret source.

use zeroize::Zeroizing;

use crate::core::constants;
use crate::error::{AuthError, Result};

/// Client id and secret. The secret is wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Zeroizing::new(client_secret.into()),
        }
    }

    /// Credentials for sources that do not authenticate.
    pub fn anonymous() -> Self {
        Self::new("anonymous", "")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials on demand.
///
/// Called on every (re-)authentication so rotated credentials are
/// picked up without a restart.
pub trait CredentialProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredential` if material is unavailable.
    fn credentials(&self) -> Result<Credentials>;
}

/// Fixed credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

/// Reads `VAULTCACHE_CLIENT_ID` and `VAULTCACHE_CLIENT_SECRET`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials> {
        let client_id = std::env::var(constants::ENV_CLIENT_ID)
            .map_err(|_| AuthError::MissingCredential(constants::ENV_CLIENT_ID))?;
        let client_secret = std::env::var(constants::ENV_CLIENT_SECRET)
            .map_err(|_| AuthError::MissingCredential(constants::ENV_CLIENT_SECRET))?;
        Ok(Credentials::new(client_id, client_secret))
    }
}
