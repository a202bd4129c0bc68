//! Candidate and persisted level records.

use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DifficultyBucket, Move, PuzzleState};

/// Content-addressable identifier of a board configuration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hexadecimal rendering of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", &self.to_hex()[..12])
    }
}

/// Identifier assigned to a level by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(i64);

impl LevelId {
    /// Creates a level identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration returned by a proposer, before classification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedLevel {
    /// Initial board.
    pub state: PuzzleState,
    /// Length of the proposer's solution, used for difficulty classification.
    #[serde(alias = "ai_steps")]
    pub steps_to_solve: i32,
    /// Move sequence solving the board, when the proposer supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<Vec<Move>>,
}

/// Run-local pool entry: a proposal tagged with its bucket and fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Proposal as returned by the proposer.
    pub proposal: ProposedLevel,
    /// Bucket assigned by the classifier.
    pub difficulty: DifficultyBucket,
    /// Content identifier of the initial board.
    pub fingerprint: ContentId,
}

/// Insert payload handed to the store when a candidate is accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewLevel {
    /// Initial board.
    pub state: PuzzleState,
    /// Assigned difficulty bucket, possibly the `unknown` sentinel.
    pub difficulty: DifficultyBucket,
    /// Steps-to-solve metric reported by the proposer.
    pub steps_to_solve: i32,
    /// Optional solving move sequence.
    pub solution: Option<Vec<Move>>,
    /// Model or source tag that produced the level.
    pub source: String,
}

impl NewLevel {
    /// Builds the insert payload for an accepted candidate.
    #[must_use]
    pub fn from_candidate(candidate: Candidate, source: &str) -> Self {
        Self {
            state: candidate.proposal.state,
            difficulty: candidate.difficulty,
            steps_to_solve: candidate.proposal.steps_to_solve,
            solution: candidate.proposal.solution,
            source: source.to_owned(),
        }
    }
}

/// Durable level record. Immutable after creation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    /// Store-assigned identifier; increases with insertion order.
    pub id: LevelId,
    /// Initial board.
    pub state: PuzzleState,
    /// Assigned difficulty bucket.
    pub difficulty: DifficultyBucket,
    /// Steps-to-solve metric.
    pub steps_to_solve: i32,
    /// Optional solving move sequence.
    pub solution: Option<Vec<Move>>,
    /// Model or source tag that produced the level.
    pub source: String,
    /// Moment the level was inserted.
    pub created_at: DateTime<Utc>,
    /// Moment the level was last modified.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{ContentId, ProposedLevel};

    #[test]
    fn content_id_renders_lowercase_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let id = ContentId::from_bytes(bytes);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("01"));
    }

    #[test]
    fn proposal_accepts_legacy_steps_field() {
        let json = r#"{"state":[[0,0],[-1,-1]],"ai_steps":7}"#;
        let proposal: ProposedLevel = serde_json::from_str(json).expect("legacy proposal");
        assert_eq!(proposal.steps_to_solve, 7);
        assert!(proposal.solution.is_none());

        let json = r#"{"state":[[0,1],[1,0],[-1,-1]],"stepsToSolve":3,"solution":[[0,2],[1,2]]}"#;
        let proposal: ProposedLevel = serde_json::from_str(json).expect("proposal");
        assert_eq!(proposal.solution.map(|moves| moves.len()), Some(2));
    }
}
