//! Crawl run summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of one prefix group during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupPhase {
    Idle,
    Enumerating,
    Fetching,
    Persisting,
    Done,
    /// Interrupted before persistence; nothing was written
    Abandoned,
}

/// Counts for one crawled prefix.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrefixOutcome {
    pub prefix: String,
    pub word_ids: usize,
    pub records: usize,
    pub fetch_failures: usize,
}

/// Counts for one prefix group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupOutcome {
    /// Leading character shared by the group's prefixes
    pub head: char,
    pub phase: GroupPhase,
    pub prefixes: Vec<PrefixOutcome>,
    /// Records appended to the corpus (0 when nothing was written)
    pub written: usize,
}

impl GroupOutcome {
    pub fn new(head: char) -> Self {
        Self {
            head,
            phase: GroupPhase::Idle,
            prefixes: Vec::new(),
            written: 0,
        }
    }

    /// Records accumulated across all prefixes of the group.
    pub fn record_count(&self) -> usize {
        self.prefixes.iter().map(|p| p.records).sum()
    }

    pub fn fetch_failures(&self) -> usize {
        self.prefixes.iter().map(|p| p.fetch_failures).sum()
    }
}

/// Summary of a whole build run.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub groups: Vec<GroupOutcome>,
    pub cancelled: bool,
}

impl BuildReport {
    /// Total records appended to the corpus.
    pub fn records_written(&self) -> usize {
        self.groups.iter().map(|g| g.written).sum()
    }

    /// Number of groups that produced a write.
    pub fn groups_written(&self) -> usize {
        self.groups.iter().filter(|g| g.written > 0).count()
    }

    pub fn fetch_failures(&self) -> usize {
        self.groups.iter().map(GroupOutcome::fetch_failures).sum()
    }
}
