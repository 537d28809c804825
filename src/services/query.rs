// src/services/query.rs

//! Query engine over the rhyme index.

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{AppError, Result};
use crate::models::QueryConfig;
use crate::services::RhymeIndex;

/// A rhyme candidate as returned to callers: `(rhyme_word, reading)`.
pub type Rhyme = (String, String);

/// Read-only queries over a shared index.
///
/// The only mutable state is the RNG, guarded by a mutex so the engine can
/// be shared across concurrent callers.
pub struct QueryEngine {
    index: Arc<RhymeIndex>,
    config: QueryConfig,
    rng: Mutex<StdRng>,
}

impl QueryEngine {
    /// Seed from `config.seed`, or from OS entropy when unset.
    pub fn new(index: Arc<RhymeIndex>, config: QueryConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(index, config, rng)
    }

    /// Use an explicit RNG.
    pub fn with_rng(index: Arc<RhymeIndex>, config: QueryConfig, rng: StdRng) -> Self {
        Self {
            index,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn index(&self) -> &RhymeIndex {
        &self.index
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Rhymes for `word`, longest first, ties in a fresh random order.
    ///
    /// `top_k = None` returns every candidate. A negative `top_k` is rejected
    /// before the lookup; an unknown word yields an empty list.
    pub fn get_rhymes(&self, word: &str, top_k: Option<i64>) -> Result<Vec<Rhyme>> {
        let limit = top_k.map(|k| non_negative("top_k", k)).transpose()?;

        let Some(candidates) = self.index.get(word) else {
            return Ok(Vec::new());
        };

        let mut ranked = candidates.to_vec();
        {
            let mut rng = self.lock_rng();
            ranked.shuffle(&mut *rng);
        }
        ranked.sort_by(|a, b| b.n_chars.cmp(&a.n_chars));

        let limit = limit.unwrap_or(ranked.len());
        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|c| (c.rhyme_word, c.reading))
            .collect())
    }

    /// A uniform sample of target words having at least
    /// `min_candidates` candidates, without duplicates.
    pub fn get_available_words(&self, n: i64) -> Result<Vec<String>> {
        let n = non_negative("n", n)?;
        let eligible = self.index.targets_with_at_least(self.config.min_candidates);
        let amount = n.min(eligible.len());

        let mut rng = self.lock_rng();
        Ok(eligible
            .choose_multiple(&mut *rng, amount)
            .map(|t| (*t).to_string())
            .collect())
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        // A panic while shuffling leaves the RNG usable.
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn non_negative(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| AppError::validation(format!("{name} must be >= 0, got {value}")))
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::models::RhymeRecord;

    fn record(target: &str, rhyme: &str, reading: &str, n_chars: u32) -> RhymeRecord {
        RhymeRecord::new(1, target, rhyme, reading, n_chars).unwrap()
    }

    fn sky_index() -> Arc<RhymeIndex> {
        Arc::new(RhymeIndex::from_records(vec![
            record("空", "月", "つき", 1),
            record("空", "風", "かぜ", 1),
            record("空", "flow", "ふろー", 3),
        ]))
    }

    fn wide_index() -> Arc<RhymeIndex> {
        let mut records = Vec::new();
        for (i, n) in [2, 5, 1, 5, 3, 2, 2, 4, 1, 5, 3, 3].iter().enumerate() {
            records.push(record("海", &format!("w{i}"), &format!("r{i}"), *n));
        }
        for t in 0..30 {
            let count = if t % 3 == 0 { 9 } else { 10 + t };
            for i in 0..count {
                records.push(record(&format!("t{t}"), &format!("x{i}"), "よみ", 1));
            }
        }
        Arc::new(RhymeIndex::from_records(records))
    }

    fn engine(index: Arc<RhymeIndex>, seed: u64) -> QueryEngine {
        QueryEngine::new(
            index,
            QueryConfig {
                seed: Some(seed),
                ..QueryConfig::default()
            },
        )
    }

    fn lengths(engine: &QueryEngine, word: &str) -> HashMap<String, u32> {
        engine
            .index()
            .get(word)
            .unwrap()
            .iter()
            .map(|c| (c.rhyme_word.clone(), c.n_chars))
            .collect()
    }

    #[test]
    fn test_top_two_of_sky() {
        let engine = engine(sky_index(), 7);
        let result = engine.get_rhymes("空", Some(2)).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0], ("flow".to_string(), "ふろー".to_string()));
        assert!(
            result[1] == ("月".to_string(), "つき".to_string())
                || result[1] == ("風".to_string(), "かぜ".to_string())
        );
    }

    #[test]
    fn test_unbounded_returns_every_candidate_once() {
        let engine = engine(wide_index(), 1);
        let result = engine.get_rhymes("海", None).unwrap();

        assert_eq!(result.len(), 12);
        let words: HashSet<_> = result.iter().map(|(w, _)| w.clone()).collect();
        let expected: HashSet<_> = (0..12).map(|i| format!("w{i}")).collect();
        assert_eq!(words, expected);
    }

    #[test]
    fn test_order_is_non_increasing_in_length() {
        let engine = engine(wide_index(), 3);
        let lens = lengths(&engine, "海");
        for _ in 0..20 {
            let result = engine.get_rhymes("海", None).unwrap();
            let ns: Vec<_> = result.iter().map(|(w, _)| lens[w]).collect();
            assert!(ns.windows(2).all(|w| w[0] >= w[1]), "{ns:?}");
        }
    }

    #[test]
    fn test_tie_groups_are_invariant_across_calls() {
        let engine = engine(wide_index(), 11);
        let lens = lengths(&engine, "海");

        let buckets = |result: Vec<Rhyme>| {
            let mut by_len: HashMap<u32, HashSet<String>> = HashMap::new();
            for (word, _) in result {
                by_len.entry(lens[&word]).or_default().insert(word);
            }
            by_len
        };

        let first = buckets(engine.get_rhymes("海", None).unwrap());
        let mut orders = HashSet::new();
        for _ in 0..30 {
            let result = engine.get_rhymes("海", None).unwrap();
            orders.insert(result.iter().map(|(w, _)| w.clone()).collect::<Vec<_>>());
            assert_eq!(buckets(result), first);
        }
        assert!(orders.len() > 1, "tie order never changed");
    }

    #[test]
    fn test_top_k_is_prefix_of_full_ordering() {
        let engine = engine(wide_index(), 5);
        let lens = lengths(&engine, "海");
        let mut all_lens: Vec<u32> = lens.values().copied().collect();
        all_lens.sort_by(|a, b| b.cmp(a));

        let result = engine.get_rhymes("海", Some(3)).unwrap();
        let got: Vec<u32> = result.iter().map(|(w, _)| lens[w]).collect();
        assert_eq!(got, all_lens[..3].to_vec());

        let short = engine.get_rhymes("空", Some(3));
        assert_eq!(short.unwrap().len(), 0);
        let sky = QueryEngine::new(sky_index(), QueryConfig::default());
        assert_eq!(sky.get_rhymes("空", Some(3)).unwrap().len(), 3);
        assert_eq!(sky.get_rhymes("空", Some(0)).unwrap().len(), 0);
    }

    #[test]
    fn test_unknown_word_is_empty() {
        let engine = engine(sky_index(), 1);
        assert!(engine.get_rhymes("nonexistent", Some(100)).unwrap().is_empty());
        assert!(engine.get_rhymes("nonexistent", None).unwrap().is_empty());
    }

    #[test]
    fn test_negative_top_k_is_rejected() {
        let engine = engine(sky_index(), 1);
        let err = engine.get_rhymes("nonexistent", Some(-1)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_available_words_are_eligible_and_unique() {
        let engine = engine(wide_index(), 9);
        let eligible: HashSet<_> = engine
            .index()
            .targets_with_at_least(10)
            .into_iter()
            .map(str::to_string)
            .collect();
        // 海 (12) plus 20 of the 30 generated targets
        assert_eq!(eligible.len(), 21);

        let sample = engine.get_available_words(5).unwrap();
        assert_eq!(sample.len(), 5);
        assert_eq!(sample.iter().collect::<HashSet<_>>().len(), 5);
        assert!(sample.iter().all(|w| eligible.contains(w)));

        let all = engine.get_available_words(100).unwrap();
        assert_eq!(all.len(), 21);
        assert_eq!(all.into_iter().collect::<HashSet<_>>(), eligible);
    }

    #[test]
    fn test_available_words_rejects_negative() {
        let engine = engine(sky_index(), 1);
        assert!(engine.get_available_words(-3).is_err());
        assert!(engine.get_available_words(10).unwrap().is_empty());
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let a = engine(wide_index(), 42);
        let b = engine(wide_index(), 42);
        assert_eq!(
            a.get_rhymes("海", None).unwrap(),
            b.get_rhymes("海", None).unwrap()
        );
        assert_eq!(
            a.get_available_words(4).unwrap(),
            b.get_available_words(4).unwrap()
        );
    }

    #[test]
    fn test_concurrent_queries() {
        let engine = Arc::new(engine(wide_index(), 2));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.get_rhymes("海", None).unwrap().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 12);
        }
    }
}
