#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Maps a steps-to-solve metric onto a configured difficulty bucket.

use sortwater_core::{DifficultyBucket, StepsThresholds};

/// Returns the first bucket, in configured order, whose inclusive range holds `steps`.
///
/// Falls back to the `unknown` sentinel when no range matches. Ranges are not
/// checked for overlap or coverage, so an earlier bucket shadows a later one.
#[must_use]
pub fn classify(steps: i32, thresholds: &StepsThresholds) -> DifficultyBucket {
    thresholds
        .iter()
        .find(|(_, range)| range.contains(steps))
        .map_or_else(DifficultyBucket::unknown, |(bucket, _)| bucket.clone())
}
