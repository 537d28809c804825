//! Storage abstractions for corpus persistence.
//!
//! The corpus is a single append-only CSV file:
//!
//! ```text
//! data/
//! └── in_note_rhymes.csv    # source_id,target_word,rhyme_word,reading,n_chars
//! ```
//!
//! Each completed prefix group is appended in one write; the header row is
//! only written when the file is created.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RhymeRecord;

// Re-export for convenience
pub use local::{CsvStorage, read_records};

/// Trait for corpus storage backends.
#[async_trait]
pub trait CorpusStorage: Send + Sync {
    /// Append one completed group atomically. Returns the rows written.
    ///
    /// Failures are `AppError::Persistence` and must abort the run.
    async fn append_group(&self, head: char, records: &[RhymeRecord]) -> Result<usize>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}
