//! Error types for vaultcache.
//!
//! Errors are grouped by the layer that produces them. The top-level
//! [`Error`] wraps each group so callers can match on the category
//! (authentication, transport, persistence, ...) without caring about
//! the concrete failure.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("secret not found: {0}")]
    SecretNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether retrying the same operation later may succeed.
    ///
    /// Transport failures and persistence hiccups are transient;
    /// bad credentials, bad input and state violations are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Persistence(_) | Error::Io(_)
        )
    }
}

/// Authentication against the secret source failed.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("credentials rejected by {source_label}: {reason}")]
    Rejected {
        source_label: String,
        reason: String,
    },

    #[error("not authenticated with {0}")]
    NotAuthenticated(String),
}

/// The secret source could not be reached or returned garbage.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("secret source unavailable: {0}")]
    Unavailable(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed response from {source_label}: {reason}")]
    Malformed {
        source_label: String,
        reason: String,
    },
}

/// A persisted snapshot failed verification.
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("failed to parse cache file: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Writing cache state to disk or the shared-memory mirror failed.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("shared-memory mirror error: {0}")]
    Mirror(String),
}

/// Bad input from a caller.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("key cannot be empty")]
    EmptyKey,

    #[error("ttl must be greater than zero")]
    ZeroTtl,
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// An operation was attempted in a state that does not allow it.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("orchestrator is not initialized")]
    NotInitialized,

    #[error("orchestrator is already initializing")]
    AlreadyInitializing,

    #[error("orchestrator is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
