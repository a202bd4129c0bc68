//! Difficulty buckets, classifier thresholds and distribution bookkeeping.

use std::{collections::BTreeMap, fmt};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the sentinel bucket assigned when no threshold range matches.
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Named difficulty category assigned from a steps-to-solve range.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DifficultyBucket(String);

impl DifficultyBucket {
    /// Creates a bucket with the provided name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Sentinel bucket used when no range contains the steps value.
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_BUCKET.to_owned())
    }

    /// Returns `true` for the sentinel bucket.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_BUCKET
    }

    /// Name of the bucket.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DifficultyBucket {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for DifficultyBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Inclusive `[lo, hi]` range of steps-to-solve values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct StepsRange {
    lo: i32,
    hi: i32,
}

impl StepsRange {
    /// Creates an inclusive range.
    #[must_use]
    pub const fn new(lo: i32, hi: i32) -> Self {
        Self { lo, hi }
    }

    /// Lower inclusive bound.
    #[must_use]
    pub const fn lo(&self) -> i32 {
        self.lo
    }

    /// Upper inclusive bound.
    #[must_use]
    pub const fn hi(&self) -> i32 {
        self.hi
    }

    /// Returns `true` when `steps` falls within the inclusive bounds.
    #[must_use]
    pub const fn contains(&self, steps: i32) -> bool {
        self.lo <= steps && steps <= self.hi
    }
}

impl From<[i32; 2]> for StepsRange {
    fn from([lo, hi]: [i32; 2]) -> Self {
        Self::new(lo, hi)
    }
}

impl From<StepsRange> for [i32; 2] {
    fn from(range: StepsRange) -> Self {
        [range.lo, range.hi]
    }
}

/// Bucket ranges in configured order. Classification picks the first match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepsThresholds(IndexMap<DifficultyBucket, StepsRange>);

impl StepsThresholds {
    /// Builds thresholds preserving the order of `entries`.
    #[must_use]
    pub fn new<B: Into<DifficultyBucket>>(
        entries: impl IntoIterator<Item = (B, StepsRange)>,
    ) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(bucket, range)| (bucket.into(), range))
                .collect(),
        )
    }

    /// Iterates buckets and ranges in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&DifficultyBucket, &StepsRange)> {
        self.0.iter()
    }

    /// Number of configured buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no bucket is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Desired share per bucket. Fractions need not sum to one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetDistribution(IndexMap<DifficultyBucket, f64>);

impl TargetDistribution {
    /// Builds a target distribution preserving the order of `entries`.
    #[must_use]
    pub fn new<B: Into<DifficultyBucket>>(entries: impl IntoIterator<Item = (B, f64)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(bucket, fraction)| (bucket.into(), fraction))
                .collect(),
        )
    }

    /// Iterates buckets and their target fractions in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&DifficultyBucket, f64)> {
        self.0.iter().map(|(bucket, fraction)| (bucket, *fraction))
    }

    /// Target fraction for `bucket`, zero when the bucket is not named.
    #[must_use]
    pub fn fraction(&self, bucket: &DifficultyBucket) -> f64 {
        self.0.get(bucket).copied().unwrap_or(0.0)
    }

    /// Number of buckets named by the target.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no bucket is named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-bucket level counts observed over the statistics window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistributionStats(BTreeMap<DifficultyBucket, u64>);

impl DistributionStats {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count recorded for `bucket`, zero when absent.
    #[must_use]
    pub fn count(&self, bucket: &DifficultyBucket) -> u64 {
        self.0.get(bucket).copied().unwrap_or(0)
    }

    /// Sum of all bucket counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Adds `amount` to the count of `bucket`.
    pub fn add(&mut self, bucket: DifficultyBucket, amount: u64) {
        *self.0.entry(bucket).or_insert(0) += amount;
    }

    /// Returns a copy of the statistics with `bucket` incremented by one.
    #[must_use]
    pub fn with_increment(&self, bucket: &DifficultyBucket) -> Self {
        let mut next = self.clone();
        next.add(bucket.clone(), 1);
        next
    }

    /// Iterates buckets and counts in bucket-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&DifficultyBucket, u64)> {
        self.0.iter().map(|(bucket, count)| (bucket, *count))
    }
}

impl<B: Into<DifficultyBucket>> FromIterator<(B, u64)> for DistributionStats {
    fn from_iter<I: IntoIterator<Item = (B, u64)>>(iter: I) -> Self {
        let mut stats = Self::new();
        for (bucket, count) in iter {
            stats.add(bucket.into(), count);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::{DifficultyBucket, DistributionStats, StepsRange, StepsThresholds};

    #[test]
    fn thresholds_preserve_json_order() {
        let json = r#"{"hard":[26,999],"easy":[0,10],"medium":[11,25]}"#;
        let thresholds: StepsThresholds = serde_json::from_str(json).expect("valid thresholds");
        let order: Vec<&str> = thresholds.iter().map(|(bucket, _)| bucket.as_str()).collect();
        assert_eq!(order, ["hard", "easy", "medium"]);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = StepsRange::new(11, 25);
        assert!(range.contains(11));
        assert!(range.contains(25));
        assert!(!range.contains(10));
        assert!(!range.contains(26));
    }

    #[test]
    fn increment_leaves_snapshot_untouched() {
        let stats: DistributionStats = [("easy", 2), ("hard", 1)].into_iter().collect();
        let bumped = stats.with_increment(&DifficultyBucket::new("medium"));
        assert_eq!(stats.total(), 3);
        assert_eq!(bumped.total(), 4);
        assert_eq!(bumped.count(&DifficultyBucket::new("medium")), 1);
    }

    #[test]
    fn unknown_bucket_is_recognised() {
        assert!(DifficultyBucket::unknown().is_unknown());
        assert!(!DifficultyBucket::new("easy").is_unknown());
    }
}
