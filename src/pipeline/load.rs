// src/pipeline/load.rs

//! Corpus loading for the query side.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::models::QueryConfig;
use crate::services::{QueryEngine, RhymeIndex};

/// Load the corpus once and wrap it in a query engine.
pub fn load_engine(corpus: impl AsRef<Path>, config: QueryConfig) -> Result<QueryEngine> {
    let index = Arc::new(RhymeIndex::load(corpus)?);
    Ok(QueryEngine::new(index, config))
}

/// Size summary of a persisted corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusInfo {
    pub target_words: usize,
    pub candidates: usize,
    /// Targets with at least the query threshold of candidates
    pub available_words: usize,
}

/// Summarize the corpus at `path`.
pub fn corpus_info(path: impl AsRef<Path>, min_candidates: usize) -> Result<CorpusInfo> {
    let index = RhymeIndex::load(path)?;
    Ok(CorpusInfo {
        target_words: index.len(),
        candidates: index.candidate_count(),
        available_words: index.targets_with_at_least(min_candidates).len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RhymeRecord;
    use crate::storage::{CorpusStorage, CsvStorage};

    #[tokio::test]
    async fn test_load_engine_and_info() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path().join("rhymes.csv"));
        let records: Vec<_> = (0..10)
            .map(|i| RhymeRecord::new(1, "空", format!("w{i}"), "よみ", 2).unwrap())
            .chain(std::iter::once(
                RhymeRecord::new(2, "海", "膿", "うみ", 1).unwrap(),
            ))
            .collect();
        storage.append_group('空', &records).await.unwrap();

        let engine = load_engine(storage.path(), QueryConfig::default()).unwrap();
        assert_eq!(engine.get_rhymes("空", None).unwrap().len(), 10);
        assert_eq!(engine.get_available_words(100).unwrap(), vec!["空".to_string()]);

        let info = corpus_info(storage.path(), 10).unwrap();
        assert_eq!(
            info,
            CorpusInfo {
                target_words: 2,
                candidates: 11,
                available_words: 1,
            }
        );
    }
}
