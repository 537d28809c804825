//! Service layer for the rhyme crawler.
//!
//! This module contains the business logic for:
//! - Page fetching with retry and rate limiting (`Fetcher`)
//! - Search listing traversal (`PageEnumerator`)
//! - Record extraction from word pages (`RecordExtractor`)
//! - Corpus acquisition (`CorpusBuilder`)
//! - Rhyme lookups (`RhymeIndex`, `QueryEngine`)

mod builder;
mod enumerator;
mod extractor;
mod fetcher;
mod index;
mod query;

pub use builder::{CancelToken, CorpusBuilder, group_prefixes};
pub use enumerator::PageEnumerator;
pub use extractor::{InNoteExtractor, RecordExtractor};
pub use fetcher::{Fetcher, RateLimiter, RetryPolicy};
pub use index::{Candidate, RhymeIndex};
pub use query::{QueryEngine, Rhyme};
