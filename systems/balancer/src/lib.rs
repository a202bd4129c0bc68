#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Greedy candidate selection that steers stored levels toward a target mix.

use sortwater_core::{Candidate, ContentId, DistributionStats, SelectionMode, TargetDistribution};

/// Sum of absolute differences between observed fractions and target fractions.
///
/// Counts are normalised by their total, with an empty window treated as a
/// total of one. Only buckets named in `target` contribute, so levels in other
/// buckets dilute the observed fractions without being scored themselves.
#[must_use]
pub fn l1_distance(stats: &DistributionStats, target: &TargetDistribution) -> f64 {
    let total = match stats.total() {
        0 => 1.0,
        total => total as f64,
    };
    target
        .iter()
        .map(|(bucket, fraction)| (stats.count(bucket) as f64 / total - fraction).abs())
        .sum()
}

/// Selection rule applied to one pass over the pool.
#[derive(Clone, Debug, PartialEq)]
pub enum BalanceMode {
    /// Accept the first unique candidate.
    Bootstrap,
    /// Score candidates against a snapshot of the windowed statistics.
    Balanced(DistributionStats),
}

impl BalanceMode {
    /// Picks the rule for a store holding `total` levels with window size `window`.
    ///
    /// `snapshot` is only invoked in balanced mode, once per pass.
    pub fn for_store<E>(
        total: u64,
        window: u64,
        snapshot: impl FnOnce() -> Result<DistributionStats, E>,
    ) -> Result<Self, E> {
        if total < window {
            Ok(Self::Bootstrap)
        } else {
            snapshot().map(Self::Balanced)
        }
    }

    /// Event-level tag of the rule.
    #[must_use]
    pub fn kind(&self) -> SelectionMode {
        match self {
            Self::Bootstrap => SelectionMode::Bootstrap,
            Self::Balanced(_) => SelectionMode::Balanced,
        }
    }
}

/// Candidate picked by a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Choice {
    /// Index of the candidate in the pool.
    pub index: usize,
    /// Change in L1 distance if the candidate is stored; balanced mode only.
    pub delta: Option<f64>,
}

/// Outcome of one pass over the pool.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    /// Picked candidate, or `None` when every scanned candidate was a duplicate.
    pub chosen: Option<Choice>,
    /// Pool indices found to be duplicates during the scan, ascending.
    pub duplicates: Vec<usize>,
}

/// Pure system choosing which candidate to commit next.
#[derive(Clone, Debug)]
pub struct Balancer {
    target: TargetDistribution,
}

impl Balancer {
    /// Creates a balancer steering toward `target`.
    #[must_use]
    pub fn new(target: TargetDistribution) -> Self {
        Self { target }
    }

    /// Target distribution the balancer steers toward.
    #[must_use]
    pub fn target(&self) -> &TargetDistribution {
        &self.target
    }

    /// Scans `pool` in order and picks at most one candidate.
    ///
    /// Bootstrap mode stops at the first candidate `is_duplicate` rejects.
    /// Balanced mode returns the first candidate that strictly reduces the
    /// distance, otherwise the least-bad one, keeping the earliest on ties.
    pub fn select(
        &self,
        pool: &[Candidate],
        mode: &BalanceMode,
        is_duplicate: impl Fn(&ContentId) -> bool,
    ) -> Selection {
        let mut selection = Selection::default();

        match mode {
            BalanceMode::Bootstrap => {
                for (index, candidate) in pool.iter().enumerate() {
                    if is_duplicate(&candidate.fingerprint) {
                        selection.duplicates.push(index);
                        continue;
                    }
                    selection.chosen = Some(Choice { index, delta: None });
                    break;
                }
            }
            BalanceMode::Balanced(stats) => {
                let dist_now = l1_distance(stats, &self.target);
                let mut best: Option<Choice> = None;

                for (index, candidate) in pool.iter().enumerate() {
                    if is_duplicate(&candidate.fingerprint) {
                        selection.duplicates.push(index);
                        continue;
                    }

                    let projected = stats.with_increment(&candidate.difficulty);
                    let delta = l1_distance(&projected, &self.target) - dist_now;
                    let choice = Choice {
                        index,
                        delta: Some(delta),
                    };

                    if delta < 0.0 {
                        best = Some(choice);
                        break;
                    }

                    let improves = match best.and_then(|current| current.delta) {
                        None => true,
                        Some(current) => delta < current,
                    };
                    if improves {
                        best = Some(choice);
                    }
                }

                selection.chosen = best;
            }
        }

        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortwater_core::{ContentId, DifficultyBucket, ProposedLevel, PuzzleState};

    fn target() -> TargetDistribution {
        TargetDistribution::new([("easy", 0.3), ("medium", 0.5), ("hard", 0.2)])
    }

    fn candidate(tag: u8, bucket: &str) -> Candidate {
        let state = PuzzleState::from_matrix(&[vec![0, 0], vec![-1, -1]]).expect("board");
        Candidate {
            proposal: ProposedLevel {
                state,
                steps_to_solve: 1,
                solution: None,
            },
            difficulty: DifficultyBucket::new(bucket),
            fingerprint: ContentId::from_bytes([tag; 32]),
        }
    }

    fn never(_: &ContentId) -> bool {
        false
    }

    #[test]
    fn matching_distribution_has_zero_distance() {
        let stats: DistributionStats = [("easy", 3), ("medium", 5), ("hard", 2)]
            .into_iter()
            .collect();
        assert!(l1_distance(&stats, &target()).abs() < 1e-9);
    }

    #[test]
    fn empty_window_scores_the_full_target_mass() {
        let distance = l1_distance(&DistributionStats::new(), &target());
        assert!((distance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unscored_buckets_dilute_observed_fractions() {
        let stats: DistributionStats = [("easy", 3), ("medium", 5), ("hard", 2), ("unknown", 10)]
            .into_iter()
            .collect();
        let distance = l1_distance(&stats, &target());
        assert!((distance - 0.5).abs() < 1e-9);
    }

    #[test]
    fn bootstrap_takes_first_unique_candidate() {
        let pool = vec![candidate(1, "hard"), candidate(2, "easy"), candidate(3, "easy")];
        let duplicate = ContentId::from_bytes([1; 32]);
        let selection = Balancer::new(target()).select(&pool, &BalanceMode::Bootstrap, |id| {
            *id == duplicate
        });
        assert_eq!(selection.chosen, Some(Choice { index: 1, delta: None }));
        assert_eq!(selection.duplicates, vec![0]);
    }

    #[test]
    fn balanced_prefers_first_improving_candidate() {
        let stats: DistributionStats = [("easy", 5), ("medium", 3), ("hard", 2)]
            .into_iter()
            .collect();
        let pool = vec![candidate(1, "easy"), candidate(2, "medium"), candidate(3, "medium")];
        let selection = Balancer::new(target()).select(&pool, &BalanceMode::Balanced(stats), never);
        let chosen = selection.chosen.expect("a candidate is chosen");
        assert_eq!(chosen.index, 1);
        assert!(chosen.delta.expect("balanced delta") < 0.0);
    }

    #[test]
    fn balanced_falls_back_to_least_bad_candidate() {
        let stats: DistributionStats = [("easy", 3), ("medium", 5), ("hard", 2)]
            .into_iter()
            .collect();
        let pool = vec![candidate(1, "easy"), candidate(2, "medium"), candidate(3, "medium")];
        let selection = Balancer::new(target()).select(&pool, &BalanceMode::Balanced(stats), never);
        let chosen = selection.chosen.expect("a candidate is chosen");
        assert_eq!(chosen.index, 1);
        assert!(chosen.delta.expect("balanced delta") >= 0.0);
        assert!(selection.duplicates.is_empty());
    }

    #[test]
    fn all_duplicates_yield_no_selection() {
        let pool = vec![candidate(1, "easy"), candidate(2, "hard")];
        let stats: DistributionStats = [("easy", 10)].into_iter().collect();
        let selection =
            Balancer::new(target()).select(&pool, &BalanceMode::Balanced(stats), |_| true);
        assert_eq!(selection.chosen, None);
        assert_eq!(selection.duplicates, vec![0, 1]);
    }

    #[test]
    fn mode_follows_store_total() {
        let mode = BalanceMode::for_store::<()>(3, 10, || panic!("no snapshot in bootstrap"));
        assert_eq!(mode, Ok(BalanceMode::Bootstrap));

        let mode = BalanceMode::for_store::<()>(10, 10, || Ok(DistributionStats::new()));
        assert_eq!(mode.map(|mode| mode.kind()), Ok(SelectionMode::Balanced));
    }
}
