// src/services/enumerator.rs

//! Search listing traversal.
//!
//! Walks every result page reachable from the listing for one prefix and
//! collects the word detail identifiers it links to.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::WordId;
use crate::services::Fetcher;
use crate::utils::url::{ListingLink, classify_link, listing_url, normalize};

/// Frontier-based enumerator over search listing pages.
pub struct PageEnumerator {
    fetcher: Fetcher,
    base_url: Url,
    timeout: Duration,
    links: Selector,
}

/// Listing pages not yet fetched, plus every page already fetched.
///
/// Scoped to one `enumerate` call.
#[derive(Debug, Default)]
struct Frontier {
    pending: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    fn seeded(url: String) -> Self {
        let mut frontier = Self::default();
        frontier.pending.insert(url);
        frontier
    }

    /// Take any pending page that has not been visited yet, marking it visited.
    fn next(&mut self) -> Option<String> {
        loop {
            let url = self.pending.iter().next()?.clone();
            self.pending.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
    }

    fn push(&mut self, url: String) {
        if !self.visited.contains(&url) {
            self.pending.insert(url);
        }
    }
}

impl PageEnumerator {
    pub fn new(fetcher: Fetcher, base_url: Url, timeout: Duration) -> Result<Self> {
        let links = Selector::parse("a[href]")
            .map_err(|e| AppError::selector("a[href]", format!("{e:?}")))?;
        Ok(Self {
            fetcher,
            base_url,
            timeout,
            links,
        })
    }

    /// Collect every word identifier reachable from the listing for `prefix`.
    ///
    /// Pages that fail to fetch are skipped. Terminates on any finite link
    /// graph since each page is fetched at most once.
    pub async fn enumerate(&self, prefix: &str) -> Result<BTreeSet<WordId>> {
        let seed = listing_url(&self.base_url, prefix)?;
        let mut frontier = Frontier::seeded(normalize(&seed).unwrap_or(seed));
        let mut ids = BTreeSet::new();

        while let Some(url) = frontier.next() {
            let html = match self.fetcher.fetch(&url, self.timeout).await {
                Ok(html) => html,
                Err(e) => {
                    log::warn!("Skipping listing page: {e}");
                    continue;
                }
            };

            for link in self.scan(&html, prefix) {
                match link {
                    ListingLink::Word(id) => {
                        ids.insert(id);
                    }
                    ListingLink::Page(page) => frontier.push(page),
                }
            }
        }

        log::debug!(
            "prefix {prefix}: {} listing pages, {} words",
            frontier.visited.len(),
            ids.len()
        );
        Ok(ids)
    }

    /// Classify every link on one listing page.
    fn scan(&self, html: &str, prefix: &str) -> Vec<ListingLink> {
        let document = Html::parse_document(html);
        document
            .select(&self.links)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| classify_link(&self.base_url, href, prefix))
            .collect()
    }
}
