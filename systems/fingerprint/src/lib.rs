#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Content fingerprints and the run-scoped deduplication index.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use sortwater_core::{ContentId, PuzzleState};

/// Computes the content identifier of a board.
///
/// The digest covers the compact JSON rendering of the slot matrix
/// (`[[-1,0,1],[...]]` without whitespace) with tube order preserved, so
/// permuting tubes yields a different identifier.
#[must_use]
pub fn fingerprint(state: &PuzzleState) -> ContentId {
    let mut hasher = Sha256::new();
    hasher.update(canonical_matrix(state).as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    ContentId::from_bytes(bytes)
}

fn canonical_matrix(state: &PuzzleState) -> String {
    serde_json::Value::from(state.to_matrix()).to_string()
}

/// Fingerprints already stored plus those accepted during the current run.
#[derive(Clone, Debug, Default)]
pub struct DedupIndex {
    persisted: HashSet<ContentId>,
    accepted: HashSet<ContentId>,
}

impl DedupIndex {
    /// Seeds the index with fingerprints loaded from the store.
    #[must_use]
    pub fn from_persisted(persisted: impl IntoIterator<Item = ContentId>) -> Self {
        Self {
            persisted: persisted.into_iter().collect(),
            accepted: HashSet::new(),
        }
    }

    /// Returns `true` when the fingerprint is stored or was accepted this run.
    #[must_use]
    pub fn contains(&self, id: &ContentId) -> bool {
        self.persisted.contains(id) || self.accepted.contains(id)
    }

    /// Records a fingerprint whose level was just committed.
    pub fn record_accepted(&mut self, id: ContentId) {
        let _ = self.accepted.insert(id);
        let _ = self.persisted.insert(id);
    }

    /// Number of known fingerprints, persisted ones included.
    #[must_use]
    pub fn persisted_len(&self) -> usize {
        self.persisted.len()
    }

    /// Number of fingerprints accepted during this run.
    #[must_use]
    pub fn accepted_len(&self) -> usize {
        self.accepted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: &[&[i32]]) -> PuzzleState {
        let rows: Vec<Vec<i32>> = rows.iter().map(|row| row.to_vec()).collect();
        PuzzleState::from_matrix(&rows).expect("valid board")
    }

    #[test]
    fn canonical_form_matches_compact_json() {
        let state = board(&[&[-1, 0, 1], &[1, 1, 0], &[-1, -1, -1]]);
        assert_eq!(canonical_matrix(&state), "[[-1,0,1],[1,1,0],[-1,-1,-1]]");
        let serialized = serde_json::to_string(&state).expect("serialize");
        assert_eq!(canonical_matrix(&state), serialized);
    }

    #[test]
    fn identical_boards_share_a_fingerprint() {
        let a = board(&[&[0, 1], &[1, 0], &[-1, -1]]);
        let b = board(&[&[0, 1], &[1, 0], &[-1, -1]]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn tube_order_changes_the_fingerprint() {
        let a = board(&[&[0, 1], &[1, 0], &[-1, -1]]);
        let b = board(&[&[1, 0], &[0, 1], &[-1, -1]]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_is_sha256_of_the_matrix() {
        let state = board(&[&[0]]);
        let expected = Sha256::digest(b"[[0]]");
        assert_eq!(fingerprint(&state).as_bytes().as_slice(), expected.as_slice());
    }

    #[test]
    fn accepted_ids_are_visible_immediately() {
        let stored = fingerprint(&board(&[&[0, 0], &[-1, -1]]));
        let fresh = fingerprint(&board(&[&[1, 1], &[-1, -1]]));
        let mut index = DedupIndex::from_persisted([stored]);

        assert!(index.contains(&stored));
        assert!(!index.contains(&fresh));

        index.record_accepted(fresh);
        assert!(index.contains(&fresh));
        assert_eq!(index.accepted_len(), 1);
        assert_eq!(index.persisted_len(), 2);
    }
}
