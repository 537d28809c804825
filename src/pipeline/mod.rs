//! Pipeline entry points for crawler and query operations.
//!
//! - `run_crawler`: Crawl all prefixes and append groups to the corpus
//! - `run_validate`: Check configuration before any network activity
//! - `load_engine`: Load the corpus into a query engine

pub mod crawl;
pub mod load;
pub mod validate;

pub use crawl::run_crawler;
pub use load::{CorpusInfo, corpus_info, load_engine};
pub use validate::run_validate;
