//! Outcome of an ingestion run.

use sortwater_core::{DifficultyBucket, DistributionStats};

/// Overall result of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IngestStatus {
    /// Every requested level was inserted.
    Complete,
    /// Some, but not all, requested levels were inserted.
    Partial,
    /// Nothing was inserted although levels were requested.
    Failed,
}

impl IngestStatus {
    /// Process exit code conventionally associated with the status.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Complete => 0,
            Self::Partial | Self::Failed => 2,
        }
    }
}

/// Counters accumulated while a run executes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Levels requested by the caller.
    pub requested: usize,
    /// Levels committed to the store.
    pub inserted: usize,
    /// Proposer requests made, failed ones included.
    pub attempts: u32,
    /// Candidates dropped as duplicates.
    pub duplicates: usize,
    /// Candidates dropped for carrying a solution that does not solve the board.
    pub invalid: usize,
    /// Set when the proposer returned an empty batch.
    pub proposer_exhausted: bool,
    /// Inserted levels per bucket.
    pub by_bucket: DistributionStats,
}

impl IngestReport {
    /// Creates an empty report for a run targeting `requested` levels.
    #[must_use]
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Self::default()
        }
    }

    /// Records a committed level.
    pub fn record_insert(&mut self, bucket: &DifficultyBucket) {
        self.inserted += 1;
        self.by_bucket.add(bucket.clone(), 1);
    }

    /// Levels still missing from the requested count.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.requested.saturating_sub(self.inserted)
    }

    /// Classifies the run from its counters.
    #[must_use]
    pub fn status(&self) -> IngestStatus {
        if self.inserted >= self.requested {
            IngestStatus::Complete
        } else if self.inserted > 0 {
            IngestStatus::Partial
        } else {
            IngestStatus::Failed
        }
    }
}
