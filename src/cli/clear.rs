//! Clear command.

use crate::cli::output;
use crate::core::clock;
use crate::core::config::Config;
use crate::core::store::CacheStore;
use crate::error::Result;

/// Delete the cached snapshot, its backing file and zero the mirror.
pub fn execute(config: &Config) -> Result<()> {
    let store = CacheStore::open(&config.cache, clock::system())?;
    store.clear()?;
    output::success(&format!("cleared {}", store.cache_file().display()));
    Ok(())
}
