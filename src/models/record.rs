//! Rhyme record data structure.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Identifier of one word detail page (`/words/<id>`).
pub type WordId = u64;

/// One rhyme candidate scraped from a word detail page.
///
/// Field order matches the persisted column order:
/// `source_id, target_word, rhyme_word, reading, n_chars`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RhymeRecord {
    /// Detail page the record was extracted from
    pub source_id: WordId,

    /// Headword the rhyme was listed for
    pub target_word: String,

    /// Candidate rhyming word
    pub rhyme_word: String,

    /// Phonetic reading of the candidate
    pub reading: String,

    /// Character length of the candidate
    pub n_chars: u32,
}

impl RhymeRecord {
    /// Build a record, rejecting empty words and a zero length.
    pub fn new(
        source_id: WordId,
        target_word: impl Into<String>,
        rhyme_word: impl Into<String>,
        reading: impl Into<String>,
        n_chars: u32,
    ) -> Result<Self> {
        let record = Self {
            source_id,
            target_word: target_word.into(),
            rhyme_word: rhyme_word.into(),
            reading: reading.into(),
            n_chars,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<()> {
        if self.n_chars == 0 {
            return Err(AppError::parse(format!(
                "record from page {} has n_chars = 0",
                self.source_id
            )));
        }
        if self.target_word.trim().is_empty() {
            return Err(AppError::parse(format!(
                "record from page {} has an empty target word",
                self.source_id
            )));
        }
        if self.rhyme_word.trim().is_empty() {
            return Err(AppError::parse(format!(
                "record from page {} has an empty rhyme word",
                self.source_id
            )));
        }
        Ok(())
    }
}
