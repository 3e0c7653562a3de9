//! Command-line interface.
//!
//! An administrative surface over the cache: inspect statistics, force a
//! refresh, read values, and clear the cached snapshot.

pub mod clear;
pub mod completions;
pub mod output;
pub mod refresh;
pub mod secrets;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::core::clock;
use crate::core::config::Config;
use crate::core::constants;
use crate::core::service::SecretCache;
use crate::core::source::{self, CredentialProvider, Credentials, EnvCredentials, StaticCredentials};
use crate::error::{Error, Result};

/// vaultcache - A local, integrity-checked cache for remotely held secrets.
#[derive(Parser)]
#[command(
    name = "vaultcache",
    about = "A local, integrity-checked cache for remotely held secrets",
    version
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file (default: ./.vaultcache.toml)
    #[arg(short, long, global = true, env = "VAULTCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Show cache statistics without contacting the secret source
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch from the secret source now and replace the cached snapshot
    Refresh,

    /// Print a secret value
    Get {
        /// Secret key
        key: String,
    },

    /// List cached secret keys
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the cached snapshot, its file and the shared-memory mirror
    Clear,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Execute a command.
pub fn execute(cli: Cli) -> Result<()> {
    use Command::*;

    let config_path = cli.config.as_deref();
    match cli.command {
        Status { json } => status::execute(&load_config(config_path)?, json),
        Refresh => refresh::execute(&load_config(config_path)?),
        Get { key } => secrets::get(&load_config(config_path)?, &key),
        List { json } => secrets::list(&load_config(config_path)?, json),
        Clear => clear::execute(&load_config(config_path)?),
        Completions { shell } => completions::execute(shell),
    }
}

/// Load configuration from an explicit path, `./.vaultcache.toml`, or
/// defaults (in that order).
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::load_from(path);
    }
    if Config::config_path().exists() {
        return Config::load();
    }

    debug!("no config file, using defaults");
    let mut config = Config::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

/// Environment credentials when a client id is set, anonymous otherwise.
fn credentials() -> Arc<dyn CredentialProvider> {
    if std::env::var(constants::ENV_CLIENT_ID).is_ok() {
        Arc::new(EnvCredentials)
    } else {
        Arc::new(StaticCredentials::new(Credentials::anonymous()))
    }
}

/// Build the cache components for `config` without starting them.
fn build_cache(config: &Config) -> Result<SecretCache> {
    let source: Arc<dyn source::SecretSource> = Arc::from(source::from_config(&config.source));
    SecretCache::build(config, source, credentials(), clock::system())
}

/// Run an async command body on a private runtime.
fn block_on<F, T>(future: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Other(format!("failed to create runtime: {}", e)))?;
    rt.block_on(future)
}
