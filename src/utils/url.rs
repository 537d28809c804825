// src/utils/url.rs

//! URL construction and link classification for the dictionary site.

use url::Url;

use crate::error::Result;
use crate::models::WordId;

/// Path of both the search listing and the detail pages.
const WORDS_PATH: &str = "/words";

/// A link found on a search listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingLink {
    /// `/words/<id>`
    Word(WordId),
    /// `/words?page=<n>...`, absolute and normalized
    Page(String),
}

/// Search listing URL for a prefix: `{base}/words?q=<prefix>`.
pub fn listing_url(base: &Url, prefix: &str) -> Result<String> {
    let mut url = base.join(WORDS_PATH)?;
    url.query_pairs_mut().append_pair("q", prefix);
    Ok(url.to_string())
}

/// Detail page URL for a word: `{base}/words/<id>`.
pub fn detail_url(base: &Url, id: WordId) -> Result<String> {
    Ok(base.join(&format!("{WORDS_PATH}/{id}"))?.to_string())
}

/// Normalize a URL string so equal pages compare equal.
pub fn normalize(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.to_string())
}

/// Classify an `href` from a listing page for the given prefix.
///
/// Pagination links carrying a different `q` belong to another listing and
/// are ignored. Links to other hosts are ignored.
pub fn classify_link(base: &Url, href: &str, prefix: &str) -> Option<ListingLink> {
    let resolved = base.join(href).ok()?;
    if resolved.host_str() != base.host_str() {
        return None;
    }

    let path = resolved.path();
    if let Some(rest) = path.strip_prefix("/words/") {
        let id = rest.trim_end_matches('/');
        return id.parse::<WordId>().ok().map(ListingLink::Word);
    }

    if path == WORDS_PATH {
        let mut has_page = false;
        for (key, value) in resolved.query_pairs() {
            match key.as_ref() {
                "page" => has_page = true,
                "q" if value != prefix => return None,
                _ => {}
            }
        }
        if has_page {
            return Some(ListingLink::Page(resolved.to_string()));
        }
    }

    None
}
