//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Persisted corpus settings
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Prefix character set to crawl
    #[serde(default)]
    pub prefixes: PrefixConfig,

    /// Query engine settings
    #[serde(default)]
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values before any network activity.
    pub fn validate(&self) -> Result<()> {
        let crawler = &self.crawler;
        url::Url::parse(&crawler.base_url)
            .map_err(|e| AppError::config(format!("crawler.base_url is invalid: {e}")))?;
        if crawler.user_agent.trim().is_empty() {
            return Err(AppError::config("crawler.user_agent is empty"));
        }
        if crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs must be > 0"));
        }
        if crawler.listing_timeout_secs == 0 {
            return Err(AppError::config("crawler.listing_timeout_secs must be > 0"));
        }
        if crawler.max_concurrent == 0 {
            return Err(AppError::config("crawler.max_concurrent must be > 0"));
        }
        if !crawler.backoff_factor.is_finite() || crawler.backoff_factor < 0.0 {
            return Err(AppError::config("crawler.backoff_factor must be >= 0"));
        }
        if !crawler.sleep_secs.is_finite() || crawler.sleep_secs < 0.0 {
            return Err(AppError::config("crawler.sleep_secs must be >= 0"));
        }

        let path = &self.corpus.path;
        if path.as_os_str().is_empty() {
            return Err(AppError::config("corpus.path is empty"));
        }
        if path.is_dir() {
            return Err(AppError::config(format!(
                "corpus.path {} is a directory",
                path.display()
            )));
        }

        self.prefixes.validate()?;
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Origin of the dictionary site
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout for word detail pages in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Request timeout for search listing pages in seconds
    #[serde(default = "defaults::listing_timeout")]
    pub listing_timeout_secs: u64,

    /// Retries after a 5xx response (total attempts = 1 + max_retries)
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff in seconds
    #[serde(default = "defaults::backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound for a single backoff sleep in seconds
    #[serde(default = "defaults::backoff_max")]
    pub backoff_max_secs: u64,

    /// Minimum spacing between any two requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent detail page fetches within one prefix
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Pause after each prefix in seconds
    #[serde(default = "defaults::sleep")]
    pub sleep_secs: f64,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn sleep(&self) -> Duration {
        Duration::from_secs_f64(self.sleep_secs.max(0.0))
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            listing_timeout_secs: defaults::listing_timeout(),
            max_retries: defaults::max_retries(),
            backoff_factor: defaults::backoff_factor(),
            backoff_max_secs: defaults::backoff_max(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            sleep_secs: defaults::sleep(),
        }
    }
}

/// Persisted corpus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// CSV file the crawler appends to and the index loads from
    #[serde(default = "defaults::corpus_path")]
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: defaults::corpus_path(),
        }
    }
}

/// Search prefix generation over a syllabary range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixConfig {
    /// First character of the range (inclusive)
    #[serde(default = "defaults::range_start")]
    pub range_start: char,

    /// Last character of the range (inclusive)
    #[serde(default = "defaults::range_end")]
    pub range_end: char,

    /// Characters never used in either position
    #[serde(default = "defaults::excluded")]
    pub excluded: String,

    /// Extra candidates for the second position
    #[serde(default = "defaults::extra_second")]
    pub extra_second: Vec<char>,
}

impl PrefixConfig {
    /// Generate every two-character prefix, in range order, without duplicates.
    pub fn generate(&self) -> Vec<String> {
        let usable = |c: &char| !self.excluded.contains(*c);
        let firsts: Vec<char> = (self.range_start..=self.range_end).filter(usable).collect();
        let seconds: Vec<char> = (self.range_start..=self.range_end)
            .chain(self.extra_second.iter().copied())
            .filter(usable)
            .collect();

        let mut seen = std::collections::HashSet::new();
        let mut prefixes = Vec::new();
        for first in &firsts {
            for second in &seconds {
                let prefix: String = [*first, *second].iter().collect();
                if seen.insert(prefix.clone()) {
                    prefixes.push(prefix);
                }
            }
        }
        prefixes
    }

    /// Validate the range and exclusions.
    pub fn validate(&self) -> Result<()> {
        if self.range_start > self.range_end {
            return Err(AppError::config(format!(
                "prefix range {}..={} is inverted",
                self.range_start, self.range_end
            )));
        }
        if self.generate().is_empty() {
            return Err(AppError::config("prefix range yields no prefixes"));
        }
        Ok(())
    }
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            range_start: defaults::range_start(),
            range_end: defaults::range_end(),
            excluded: defaults::excluded(),
            extra_second: defaults::extra_second(),
        }
    }
}

/// Query engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// `top_k` used when a caller omits it
    #[serde(default = "defaults::default_top_k")]
    pub default_top_k: usize,

    /// `n` used when a caller omits it
    #[serde(default = "defaults::default_sample")]
    pub default_sample: usize,

    /// Minimum candidate count for a word to be offered as available
    #[serde(default = "defaults::min_candidates")]
    pub min_candidates: usize,

    /// Fixed RNG seed for reproducible ordering and sampling
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: defaults::default_top_k(),
            default_sample: defaults::default_sample(),
            min_candidates: defaults::min_candidates(),
            seed: None,
        }
    }
}

impl QueryConfig {
    /// `default_top_k` as a query argument, saturating at `i64::MAX`.
    pub fn top_k_arg(&self) -> i64 {
        i64::try_from(self.default_top_k).unwrap_or(i64::MAX)
    }

    /// `default_sample` as a query argument, saturating at `i64::MAX`.
    pub fn sample_arg(&self) -> i64 {
        i64::try_from(self.default_sample).unwrap_or(i64::MAX)
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn base_url() -> String {
        "https://in-note.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 15_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn listing_timeout() -> u64 {
        10
    }
    pub fn max_retries() -> u32 {
        5
    }
    pub fn backoff_factor() -> f64 {
        1.0
    }
    pub fn backoff_max() -> u64 {
        120
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_concurrent() -> usize {
        1
    }
    pub fn sleep() -> f64 {
        1.0
    }

    // Corpus defaults
    pub fn corpus_path() -> PathBuf {
        PathBuf::from("data").join("in_note_rhymes.csv")
    }

    // Prefix defaults
    pub fn range_start() -> char {
        'あ'
    }
    pub fn range_end() -> char {
        'ん'
    }
    pub fn excluded() -> String {
        "ぁぃぅぇぉゃゅょゎゐゑをん".into()
    }
    pub fn extra_second() -> Vec<char> {
        vec!['っ']
    }

    // Query defaults
    pub fn default_top_k() -> usize {
        100
    }
    pub fn default_sample() -> usize {
        100
    }
    pub fn min_candidates() -> usize {
        10
    }
}
