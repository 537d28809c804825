//! In-memory rhyme index.
//!
//! Built once from the full corpus and never mutated; reload to refresh.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::models::RhymeRecord;
use crate::storage::read_records;

/// One indexed rhyme candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub rhyme_word: String,
    pub reading: String,
    pub n_chars: u32,
}

impl From<RhymeRecord> for Candidate {
    fn from(record: RhymeRecord) -> Self {
        Self {
            rhyme_word: record.rhyme_word,
            reading: record.reading,
            n_chars: record.n_chars,
        }
    }
}

/// Target word → candidates, in corpus order.
#[derive(Debug, Default)]
pub struct RhymeIndex {
    entries: HashMap<String, Vec<Candidate>>,
    /// Target words in first-appearance order
    targets: Vec<String>,
}

impl RhymeIndex {
    /// Load the persisted corpus at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let records = read_records(path)?;
        let index = Self::from_records(records);
        log::info!(
            "Loaded rhyme index from {}: {} target words, {} candidates",
            path.display(),
            index.len(),
            index.candidate_count()
        );
        Ok(index)
    }

    /// Group records by target word. Duplicates are kept.
    pub fn from_records(records: impl IntoIterator<Item = RhymeRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            match index.entries.get_mut(&record.target_word) {
                Some(candidates) => candidates.push(record.into()),
                None => {
                    index.targets.push(record.target_word.clone());
                    let target = record.target_word.clone();
                    index.entries.insert(target, vec![record.into()]);
                }
            }
        }
        index
    }

    /// Candidates for a target word.
    pub fn get(&self, target: &str) -> Option<&[Candidate]> {
        self.entries.get(target).map(Vec::as_slice)
    }

    /// Target words in corpus order.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Target words with at least `min` candidates, in corpus order.
    pub fn targets_with_at_least(&self, min: usize) -> Vec<&str> {
        self.targets
            .iter()
            .filter(|t| self.entries.get(*t).is_some_and(|c| c.len() >= min))
            .map(String::as_str)
            .collect()
    }

    /// Number of target words.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn candidate_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
