// src/models/mod.rs

//! Domain models for the rhyme crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod record;
mod report;

// Re-export all public types
pub use config::{Config, CorpusConfig, CrawlerConfig, PrefixConfig, QueryConfig};
pub use record::{RhymeRecord, WordId};
pub use report::{BuildReport, GroupOutcome, GroupPhase, PrefixOutcome};
