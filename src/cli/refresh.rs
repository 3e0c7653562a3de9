//! Forced refresh command.

use crate::cli::{block_on, build_cache, output};
use crate::core::config::Config;
use crate::core::orchestrator::RefreshOrchestrator;
use crate::core::types::Version;
use crate::error::{Error, Result};

/// Fetch from the secret source and replace the cached snapshot.
pub fn execute(config: &Config) -> Result<()> {
    block_on(async {
        let cache = build_cache(config)?;
        let orchestrator = cache.orchestrator().clone();
        let result = force_refresh(&orchestrator).await;
        let stats = orchestrator.statistics();
        cache.shutdown().await;

        let version = result?;
        output::success(&format!(
            "cache refreshed: version {} ({} key{})",
            version,
            stats.cache.key_count,
            if stats.cache.key_count == 1 { "" } else { "s" }
        ));
        if stats.cache.persist_failures > 0 {
            output::warn("snapshot could not be written to disk");
        }
        Ok::<(), Error>(())
    })
}

/// Initialize, then refresh unless initialization already had to fetch.
async fn force_refresh(orchestrator: &std::sync::Arc<RefreshOrchestrator>) -> Result<Version> {
    let before = orchestrator.store().version();
    orchestrator.initialize().await?;

    let current = orchestrator.store().version();
    if current > before {
        return Ok(current);
    }
    orchestrator.refresh().await
}
