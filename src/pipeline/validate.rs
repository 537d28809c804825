// src/pipeline/validate.rs

use crate::error::Result;
use crate::models::Config;

/// Validate configuration and log what a crawl would do.
pub fn run_validate(config: &Config) -> Result<()> {
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {e}");
        return Err(e);
    }

    let prefixes = config.prefixes.generate();
    log::info!("✓ Config OK");
    log::info!("    Base URL: {}", config.crawler.base_url);
    log::info!("    Corpus: {}", config.corpus.path.display());
    log::info!(
        "    Timeouts: {}s detail, {}s listing",
        config.crawler.timeout_secs,
        config.crawler.listing_timeout_secs
    );
    log::info!(
        "    Retries: {} (backoff factor {}s)",
        config.crawler.max_retries,
        config.crawler.backoff_factor
    );
    log::info!(
        "    Prefixes: {} ({}..={}, first {:?})",
        prefixes.len(),
        config.prefixes.range_start,
        config.prefixes.range_end,
        prefixes.first()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(run_validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_concurrency_fails() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(run_validate(&config).is_err());
    }
}
