//! Information display handlers (cache statistics, config)

use crate::cache::ResponseCache;
use crate::cli::output::*;
use crate::AppConfig;
use crate::Result;

pub async fn handle_cache_stats_command(config: &AppConfig) -> Result<()> {
    if !config.cache.enabled {
        print_info("Response cache is disabled (cache.enabled = false)");
        return Ok(());
    }

    let cache = ResponseCache::from_config(config).await?;
    let entries = cache.len().await?;
    print_cache_stats(&config.cache_path(), entries, &cache.stats().await);
    cache.close().await;
    Ok(())
}

pub async fn handle_config_command(config: &AppConfig) -> Result<()> {
    print_config(config);
    Ok(())
}
