//! Secret read commands (get, list).

use crate::cli::{block_on, build_cache, output};
use crate::core::config::Config;
use crate::core::types::SecretMap;
use crate::error::{Error, Result};

/// Print a single secret value.
///
/// Served from the cache file when it is valid; otherwise the source is
/// fetched first.
pub fn get(config: &Config, key: &str) -> Result<()> {
    let value = block_on(async {
        let cache = build_cache(config)?;
        let orchestrator = cache.orchestrator().clone();
        let result = match orchestrator.initialize().await {
            Ok(()) => orchestrator.get_value(key).await,
            Err(e) => Err(e),
        };
        cache.shutdown().await;
        result
    })?;

    match value {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => Err(Error::SecretNotFound(key.to_string())),
    }
}

/// List cached secret keys.
pub fn list(config: &Config, json: bool) -> Result<()> {
    let secrets = block_on(async {
        let cache = build_cache(config)?;
        let orchestrator = cache.orchestrator().clone();
        let result = match orchestrator.initialize().await {
            Ok(()) => orchestrator.get_all().await,
            Err(e) => Err(e),
        };
        cache.shutdown().await;
        result
    })?;

    if json {
        print_json(&secrets);
        return Ok(());
    }

    if secrets.is_empty() {
        output::dimmed("no secrets cached");
        return Ok(());
    }

    output::header(&format!("{} secrets", secrets.len()));
    for key in secrets.keys() {
        output::list_item(key);
    }
    Ok(())
}

fn print_json(secrets: &SecretMap) {
    let keys: Vec<&String> = secrets.keys().collect();
    let output = serde_json::json!({
        "keys": keys,
        "count": keys.len(),
    });
    println!("{}", output);
}
