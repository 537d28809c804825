//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use http::{HttpTransport, RawResponse, Transport, create_async_client};
pub use self::url::{ListingLink, classify_link, detail_url, listing_url};
