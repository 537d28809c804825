// src/pipeline/crawl.rs

//! Corpus acquisition pipeline.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{BuildReport, Config};
use crate::services::{CancelToken, CorpusBuilder, Fetcher, InNoteExtractor};
use crate::storage::CorpusStorage;
use crate::utils::Transport;

/// Crawl `prefixes` and append each completed group to `storage`.
///
/// The configuration is validated first so that a bad setup fails before
/// the first request.
pub async fn run_crawler(
    config: &Config,
    transport: Arc<dyn Transport>,
    storage: &dyn CorpusStorage,
    prefixes: &[String],
    cancel: CancelToken,
) -> Result<BuildReport> {
    config.validate()?;

    log::info!(
        "Crawling {} prefixes from {} into {}",
        prefixes.len(),
        config.crawler.base_url,
        storage.location()
    );

    let fetcher = Fetcher::from_config(transport, &config.crawler);
    let extractor = Arc::new(InNoteExtractor::new()?);
    let builder =
        CorpusBuilder::new(&config.crawler, fetcher, extractor, storage)?.with_cancel(cancel);

    let report = builder.build(prefixes, config.crawler.sleep()).await?;

    log::info!(
        "Crawl finished in {}s: {} records in {} groups, {} failed pages{}",
        (report.end_time - report.start_time).num_seconds(),
        report.records_written(),
        report.groups_written(),
        report.fetch_failures(),
        if report.cancelled { " (cancelled)" } else { "" }
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::CsvStorage;
    use crate::utils::HttpTransport;

    #[tokio::test]
    async fn test_invalid_config_fails_before_network() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.crawler.timeout_secs = 0;
        config.corpus.path = tmp.path().join("rhymes.csv");

        let transport = Arc::new(HttpTransport::new(reqwest::Client::new()));
        let storage = CsvStorage::new(&config.corpus.path);
        let err = run_crawler(
            &config,
            transport,
            &storage,
            &["ああ".to_string()],
            CancelToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
        assert!(!storage.path().exists());
    }
}
