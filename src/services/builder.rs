// src/services/builder.rs

//! Corpus builder service.
//!
//! Crawls prefix groups one at a time, enumerating word pages, fetching and
//! extracting their records, and appending each finished group to storage.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    BuildReport, CrawlerConfig, GroupOutcome, GroupPhase, PrefixOutcome, RhymeRecord, WordId,
};
use crate::services::{Fetcher, PageEnumerator, RecordExtractor};
use crate::storage::CorpusStorage;
use crate::utils::detail_url;

/// Cooperative cancellation flag, checked at group boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Group prefixes by leading character, keeping first-appearance order.
pub fn group_prefixes(prefixes: &[String]) -> Vec<(char, Vec<String>)> {
    let mut groups: Vec<(char, Vec<String>)> = Vec::new();
    let mut positions: HashMap<char, usize> = HashMap::new();

    for prefix in prefixes {
        let Some(head) = prefix.chars().next() else {
            continue;
        };
        let idx = *positions.entry(head).or_insert_with(|| {
            groups.push((head, Vec::new()));
            groups.len() - 1
        });
        groups[idx].1.push(prefix.clone());
    }

    groups
}

/// Orchestrates enumeration, fetching, extraction, and persistence.
pub struct CorpusBuilder<'a> {
    enumerator: PageEnumerator,
    fetcher: Fetcher,
    extractor: Arc<dyn RecordExtractor>,
    storage: &'a dyn CorpusStorage,
    base_url: Url,
    detail_timeout: Duration,
    concurrency: usize,
    cancel: CancelToken,
}

impl<'a> CorpusBuilder<'a> {
    /// Create a builder sharing one fetcher (and request budget) between
    /// listing and detail pages.
    pub fn new(
        config: &CrawlerConfig,
        fetcher: Fetcher,
        extractor: Arc<dyn RecordExtractor>,
        storage: &'a dyn CorpusStorage,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::config(format!("crawler.base_url is invalid: {e}")))?;
        let enumerator =
            PageEnumerator::new(fetcher.clone(), base_url.clone(), config.listing_timeout())?;

        Ok(Self {
            enumerator,
            fetcher,
            extractor,
            storage,
            base_url,
            detail_timeout: config.timeout(),
            concurrency: config.max_concurrent.max(1),
            cancel: CancelToken::new(),
        })
    }

    /// Use an externally controlled cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Crawl all prefixes, sleeping `sleep` after each one.
    ///
    /// Only a persistence failure aborts the run. A cancelled group is
    /// abandoned without writing and the run stops.
    pub async fn build(&self, prefixes: &[String], sleep: Duration) -> Result<BuildReport> {
        let start_time = Utc::now();
        let mut groups = Vec::new();
        let mut cancelled = false;

        for (head, group) in group_prefixes(prefixes) {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let outcome = self.build_group(head, &group, sleep).await?;
            let abandoned = outcome.phase == GroupPhase::Abandoned;
            groups.push(outcome);
            if abandoned {
                cancelled = true;
                break;
            }
        }

        Ok(BuildReport {
            start_time,
            end_time: Utc::now(),
            groups,
            cancelled,
        })
    }

    /// Crawl one group and append it to storage if it yielded anything.
    async fn build_group(
        &self,
        head: char,
        prefixes: &[String],
        sleep: Duration,
    ) -> Result<GroupOutcome> {
        let mut outcome = GroupOutcome::new(head);
        let mut records = Vec::new();

        for prefix in prefixes {
            if self.cancel.is_cancelled() {
                log::warn!("group: {head} abandoned before completion, nothing written");
                outcome.phase = GroupPhase::Abandoned;
                return Ok(outcome);
            }

            outcome.phase = GroupPhase::Enumerating;
            let ids = self.enumerator.enumerate(prefix).await?;

            outcome.phase = GroupPhase::Fetching;
            let (prefix_records, fetch_failures) = self.collect_records(&ids).await;
            log::info!(
                "prefix: {} total {} words: total {} records",
                prefix,
                ids.len(),
                prefix_records.len()
            );

            outcome.prefixes.push(PrefixOutcome {
                prefix: prefix.clone(),
                word_ids: ids.len(),
                records: prefix_records.len(),
                fetch_failures,
            });
            records.extend(prefix_records);

            if !sleep.is_zero() {
                tokio::time::sleep(sleep).await;
            }
        }

        if self.cancel.is_cancelled() {
            log::warn!("group: {head} abandoned before persisting, nothing written");
            outcome.phase = GroupPhase::Abandoned;
            return Ok(outcome);
        }

        if !records.is_empty() {
            outcome.phase = GroupPhase::Persisting;
            outcome.written = self
                .storage
                .append_group(head, &records)
                .await
                .inspect_err(|e| log::error!("group: {head} could not be written: {e}"))?;
            log::info!(
                "group: {} written {} records to {}",
                head,
                outcome.written,
                self.storage.location()
            );
        } else {
            log::info!("group: {head} yielded no records");
        }

        outcome.phase = GroupPhase::Done;
        log::debug!(
            "group: {} done, {} records from {} prefixes, {} failed pages",
            head,
            outcome.record_count(),
            outcome.prefixes.len(),
            outcome.fetch_failures()
        );
        Ok(outcome)
    }

    /// Fetch and extract every word page. Returns the records and the
    /// number of pages that failed to fetch.
    async fn collect_records(&self, ids: &BTreeSet<WordId>) -> (Vec<RhymeRecord>, usize) {
        let mut records = Vec::new();
        let mut failures = 0;

        let mut pages = stream::iter(ids.iter().copied())
            .map(|id| async move { self.fetch_word(id).await })
            .buffer_unordered(self.concurrency);

        while let Some(result) = pages.next().await {
            match result {
                Ok(word_records) => records.extend(word_records),
                Err(e) => {
                    failures += 1;
                    log::warn!("Failed to fetch word page: {e}");
                }
            }
        }

        (records, failures)
    }

    async fn fetch_word(&self, id: WordId) -> Result<Vec<RhymeRecord>> {
        let url = detail_url(&self.base_url, id)?;
        let page = self.fetcher.fetch(&url, self.detail_timeout).await?;
        Ok(self.extractor.extract(&page, id))
    }
}
