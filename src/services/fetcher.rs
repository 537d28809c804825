// src/services/fetcher.rs

//! Page fetcher with retry, exponential backoff, and a shared request budget.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::Transport;

/// Retry behavior for server errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Seconds; the n-th retry waits `backoff_factor * 2^(n-1)`
    pub backoff_factor: f64,
    /// Cap for a single backoff sleep
    pub backoff_max: Duration,
}

impl RetryPolicy {
    /// Sleep before the given retry (1-based), never above `backoff_max`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(30);
        let secs = self.backoff_factor * f64::from(1u32 << exponent);
        Duration::try_from_secs_f64(secs.max(0.0))
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }
}

impl From<&CrawlerConfig> for RetryPolicy {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            backoff_max: Duration::from_secs(config.backoff_max_secs),
        }
    }
}

/// Enforces a minimum spacing between requests across all callers.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until this caller may issue a request.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        if let Some(slot) = *next_slot {
            if slot > now {
                tokio::time::sleep_until(slot).await;
            }
        }
        *next_slot = Some(Instant::now() + self.interval);
    }
}

/// GET-only fetcher. Retries 5xx responses; everything else fails fast.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    limiter: Arc<RateLimiter>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy, limiter: Arc<RateLimiter>) -> Self {
        Self {
            transport,
            policy,
            limiter,
        }
    }

    /// Build a fetcher from the crawler settings.
    pub fn from_config(transport: Arc<dyn Transport>, config: &CrawlerConfig) -> Self {
        let limiter = RateLimiter::new(Duration::from_millis(config.request_delay_ms));
        Self::new(transport, RetryPolicy::from(config), Arc::new(limiter))
    }

    /// Fetch a page body.
    ///
    /// Returns `AppError::Fetch` on transport failure, a non-retryable
    /// status, or when retries are exhausted.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let mut retry = 0;
        loop {
            self.limiter.acquire().await;
            let response = self
                .transport
                .get(url, timeout)
                .await
                .map_err(|e| AppError::fetch(url, e))?;

            if response.is_success() {
                return Ok(response.body);
            }
            if !response.is_server_error() {
                return Err(AppError::fetch(url, format!("status {}", response.status)));
            }
            if retry >= self.policy.max_retries {
                return Err(AppError::fetch(
                    url,
                    format!(
                        "status {} after {} retries",
                        response.status, self.policy.max_retries
                    ),
                ));
            }

            retry += 1;
            let delay = self.policy.backoff_delay(retry);
            log::debug!(
                "{} returned {}, retry {}/{} in {:?}",
                url,
                response.status,
                retry,
                self.policy.max_retries,
                delay
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::utils::RawResponse;

    /// Replays a fixed sequence of statuses, then keeps returning the last one.
    pub(crate) struct ScriptedTransport {
        script: StdMutex<VecDeque<u16>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedTransport {
        pub(crate) fn new(statuses: &[u16]) -> Self {
            Self {
                script: StdMutex::new(statuses.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, _url: &str, _timeout: Duration) -> Result<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let status = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                *script.front().unwrap_or(&200)
            };
            Ok(RawResponse::new(status, format!("body {status}")))
        }
    }

    /// Serves fixed pages by URL; unknown URLs are a transport failure.
    pub(crate) struct PageTransport {
        pages: HashMap<String, RawResponse>,
        pub(crate) requested: StdMutex<Vec<String>>,
    }

    impl PageTransport {
        pub(crate) fn new() -> Self {
            Self {
                pages: HashMap::new(),
                requested: StdMutex::new(Vec::new()),
            }
        }

        pub(crate) fn page(mut self, url: &str, status: u16, body: &str) -> Self {
            let key = crate::utils::url::normalize(url).unwrap_or_else(|| url.to_string());
            self.pages.insert(key, RawResponse::new(status, body));
            self
        }

        pub(crate) fn requests_for(&self, url: &str) -> usize {
            let key = crate::utils::url::normalize(url).unwrap_or_else(|| url.to_string());
            self.requested
                .lock()
                .unwrap()
                .iter()
                .filter(|u| **u == key)
                .count()
        }
    }

    #[async_trait]
    impl Transport for PageTransport {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<RawResponse> {
            let key = crate::utils::url::normalize(url).unwrap_or_else(|| url.to_string());
            self.requested.lock().unwrap().push(key.clone());
            self.pages
                .get(&key)
                .cloned()
                .ok_or_else(|| AppError::fetch(url, "connection refused"))
        }
    }

    pub(crate) fn no_backoff(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_factor: 0.0,
            backoff_max: Duration::ZERO,
        }
    }

    pub(crate) fn fetcher_over(transport: Arc<dyn Transport>, max_retries: u32) -> Fetcher {
        Fetcher::new(
            transport,
            no_backoff(max_retries),
            Arc::new(RateLimiter::new(Duration::ZERO)),
        )
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_first_attempt_success_does_not_retry() {
        let transport = Arc::new(ScriptedTransport::new(&[200]));
        let fetcher = fetcher_over(transport.clone(), 5);

        let body = fetcher.fetch("https://example.com/", TIMEOUT).await.unwrap();
        assert_eq!(body, "body 200");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_five_503_then_200_succeeds_with_five_retries() {
        let transport = Arc::new(ScriptedTransport::new(&[503, 503, 503, 503, 503, 200]));
        let fetcher = fetcher_over(transport.clone(), 5);

        let body = fetcher.fetch("https://example.com/", TIMEOUT).await.unwrap();
        assert_eq!(body, "body 200");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_five_503_exhausts_four_retries() {
        let transport = Arc::new(ScriptedTransport::new(&[503, 503, 503, 503, 503, 200]));
        let fetcher = fetcher_over(transport.clone(), 4);

        let err = fetcher.fetch("https://example.com/", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(&[404, 200]));
        let fetcher = fetcher_over(transport.clone(), 5);

        let err = fetcher.fetch("https://example.com/", TIMEOUT).await.unwrap_err();
        assert!(err.is_soft());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let transport = Arc::new(PageTransport::new());
        let fetcher = fetcher_over(transport.clone(), 5);

        let err = fetcher.fetch("https://example.com/missing", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
        assert_eq!(transport.requests_for("https://example.com/missing"), 1);
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy {
            max_retries: 5,
            backoff_factor: 1.0,
            backoff_max: Duration::from_secs(120),
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(10), Duration::from_secs(120));
    }

    #[test]
    fn test_huge_backoff_factor_is_capped() {
        let mut config = crate::models::Config::default();
        config.crawler.backoff_factor = 1e20;
        assert!(config.validate().is_ok());

        let policy = RetryPolicy::from(&config.crawler);
        assert_eq!(policy.backoff_delay(1), policy.backoff_max);

        let policy = RetryPolicy {
            backoff_factor: 1e12,
            ..policy
        };
        assert_eq!(policy.backoff_delay(31), policy.backoff_max);
        assert_eq!(policy.backoff_delay(u32::MAX), policy.backoff_max);
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
