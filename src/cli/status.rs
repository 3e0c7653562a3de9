//! Cache status overview command.
//!
//! Reads the cache file directly; the secret source is never contacted.

use chrono::{DateTime, Utc};

use crate::cli::output;
use crate::core::clock;
use crate::core::config::Config;
use crate::core::store::{CacheStatistics, CacheStatus, CacheStore};
use crate::error::{Error, Result};

/// Show cache statistics.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let store = CacheStore::open(&config.cache, clock::system())?;
    let stats = store.statistics();

    if json {
        let encoded = serde_json::to_string_pretty(&stats)
            .map_err(|e| Error::Other(format!("failed to encode statistics: {}", e)))?;
        println!("{}", encoded);
        return Ok(());
    }

    print_summary(config, &stats);
    Ok(())
}

fn print_summary(config: &Config, stats: &CacheStatistics) {
    output::section("vaultcache");

    output::kv("status", stats.status);
    output::kv("file", stats.cache_file.display());
    output::kv("source", stats.source.as_deref().unwrap_or(&config.source.address));

    if stats.status == CacheStatus::Empty {
        println!();
        output::dimmed("no snapshot cached");
        output::hint("run: vaultcache refresh");
        return;
    }

    output::kv("version", stats.version);
    output::kv(
        "secrets",
        format!(
            "{} key{}",
            stats.key_count,
            if stats.key_count == 1 { "" } else { "s" }
        ),
    );
    output::kv("created", timestamp(stats.created_at));
    output::kv("expires", timestamp(stats.expires_at));
    output::kv("accessed", timestamp(stats.last_accessed_at));
    output::kv("reads", stats.access_count);
    if let Some(hash) = &stats.data_hash {
        output::kv("sha256", &hash[..hash.len().min(16)]);
    }

    if stats.status == CacheStatus::Expired {
        println!();
        output::warn("cache expired");
        output::hint("run: vaultcache refresh");
    }
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
