//! vaultcache - A local, integrity-checked cache for remotely held secrets.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vaultcache::cli::output;
use vaultcache::cli::{execute, Cli};
use vaultcache::core::constants::ENV_LOG;
use vaultcache::error::{AuthError, ConfigError, Error, StateError, TransportError};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("vaultcache=debug")
        } else {
            EnvFilter::new("vaultcache=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    if let Err(e) = execute(cli) {
        output::error(&e.to_string());
        if let Some(hint) = suggestion(&e) {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}

fn suggestion(err: &Error) -> Option<&'static str> {
    match err {
        Error::Config(ConfigError::NotFound(_)) => {
            Some("create .vaultcache.toml or pass --config")
        }
        Error::Auth(AuthError::MissingCredential(_)) => {
            Some("set VAULTCACHE_CLIENT_ID and VAULTCACHE_CLIENT_SECRET")
        }
        Error::Transport(TransportError::Timeout(_)) => {
            Some("raise cache.fetch_timeout_secs or check the source")
        }
        Error::State(StateError::NotInitialized) => Some("run: vaultcache refresh"),
        Error::SecretNotFound(_) => Some("run: vaultcache list"),
        _ => None,
    }
}
