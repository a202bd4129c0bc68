//! Events broadcast by the ingestion pipeline while it curates a batch.

use crate::{ContentId, DifficultyBucket, LevelId};

/// Selection rule the balancer applied to a pool pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// Store holds fewer levels than the window: first unique candidate wins.
    Bootstrap,
    /// Windowed statistics steer selection toward the target distribution.
    Balanced,
}

/// Reason a candidate was dropped before it could be scored or stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    /// The board's fingerprint is already stored or accepted earlier in the run.
    Duplicate,
    /// The supplied solution does not replay to a solved board.
    InvalidSolution {
        /// Index of the first move that could not be applied, if any.
        failed_move: Option<usize>,
    },
}

/// Events emitted by the ingestion orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestEvent {
    /// A new candidate batch was requested from the proposer.
    BatchRequested {
        /// One-based attempt counter after the request.
        attempt: u32,
        /// Number of candidates requested.
        requested: usize,
    },
    /// The proposer call failed; the attempt is consumed.
    ProposerFailed {
        /// Attempt that failed.
        attempt: u32,
        /// Rendered error reported by the proposer.
        message: String,
    },
    /// The proposer returned an empty batch; the run cannot proceed.
    ProposerExhausted {
        /// Attempt that came back empty.
        attempt: u32,
    },
    /// A candidate was dropped without consuming attempt budget.
    CandidateRejected {
        /// Fingerprint of the rejected board.
        fingerprint: ContentId,
        /// Why the candidate was dropped.
        reason: RejectionReason,
    },
    /// No candidate in the pool could be selected; the pool was cleared.
    PoolDiscarded {
        /// Candidates left in the pool when it was cleared.
        remaining: usize,
    },
    /// A candidate was committed to the store.
    LevelInserted {
        /// Identifier assigned by the store.
        id: LevelId,
        /// Bucket of the committed level.
        difficulty: DifficultyBucket,
        /// Steps-to-solve of the committed level.
        steps_to_solve: i32,
        /// Rule used to pick the candidate.
        mode: SelectionMode,
        /// Change in L1 distance caused by the insertion; balanced mode only.
        delta: Option<f64>,
    },
}
