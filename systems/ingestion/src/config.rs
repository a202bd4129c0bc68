//! Tunables of an ingestion run and their validation.

use sortwater_core::{DifficultyBucket, StepsRange, StepsThresholds, TargetDistribution};
use thiserror::Error;

/// Default number of most recent levels inspected for distribution statistics.
pub const DEFAULT_WINDOW: u64 = 10;

/// Default number of proposer requests allowed per run.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default ratio between requested candidates and the target count.
pub const DEFAULT_BATCH_MULTIPLIER: usize = 3;

/// Settings consumed by the orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestConfig {
    /// Ordered steps ranges used to classify candidates.
    pub thresholds: StepsThresholds,
    /// Target fraction per bucket. Need not sum to one.
    pub target: TargetDistribution,
    /// Levels in the statistics window; smaller stores run in bootstrap mode.
    pub window: u64,
    /// Proposer requests allowed per run, failed ones included.
    pub max_attempts: u32,
    /// Candidates requested per batch as a multiple of the target count.
    pub batch_multiplier: usize,
    /// Drop candidates whose supplied solution does not solve their board.
    pub verify_solutions: bool,
    /// Seed for the pool shuffle; drawn from entropy when absent.
    pub shuffle_seed: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            thresholds: StepsThresholds::new([
                ("easy", StepsRange::new(0, 10)),
                ("medium", StepsRange::new(11, 25)),
                ("hard", StepsRange::new(26, 999)),
            ]),
            target: TargetDistribution::new([("easy", 0.3), ("medium", 0.5), ("hard", 0.2)]),
            window: DEFAULT_WINDOW,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            batch_multiplier: DEFAULT_BATCH_MULTIPLIER,
            verify_solutions: true,
            shuffle_seed: None,
        }
    }
}

impl IngestConfig {
    /// Rejects settings the orchestrator cannot act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.is_empty() {
            return Err(ConfigError::EmptyTarget);
        }
        for (bucket, fraction) in self.target.iter() {
            if !fraction.is_finite() || fraction < 0.0 {
                return Err(ConfigError::InvalidFraction {
                    bucket: bucket.clone(),
                    fraction,
                });
            }
        }

        if self.thresholds.is_empty() {
            return Err(ConfigError::EmptyThresholds);
        }
        for (bucket, range) in self.thresholds.iter() {
            if range.lo() > range.hi() {
                return Err(ConfigError::InvertedRange {
                    bucket: bucket.clone(),
                    lo: range.lo(),
                    hi: range.hi(),
                });
            }
        }

        if self.batch_multiplier == 0 {
            return Err(ConfigError::ZeroBatchMultiplier);
        }
        Ok(())
    }
}

/// Reasons an [`IngestConfig`] is rejected before any proposer call.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// No target distribution was configured.
    #[error("target distribution is empty")]
    EmptyTarget,
    /// A target fraction is negative or not a number.
    #[error("target fraction for `{bucket}` must be a non-negative number, got {fraction}")]
    InvalidFraction {
        /// Offending bucket.
        bucket: DifficultyBucket,
        /// Offending fraction.
        fraction: f64,
    },
    /// No steps thresholds were configured.
    #[error("steps thresholds are empty")]
    EmptyThresholds,
    /// A threshold range has its bounds reversed.
    #[error("steps range for `{bucket}` is inverted: [{lo}, {hi}]")]
    InvertedRange {
        /// Offending bucket.
        bucket: DifficultyBucket,
        /// Lower bound.
        lo: i32,
        /// Upper bound.
        hi: i32,
    },
    /// Batches would request no candidates.
    #[error("batch multiplier must be at least one")]
    ZeroBatchMultiplier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(IngestConfig::default().validate(), Ok(()));
    }

    #[test]
    fn target_need_not_sum_to_one() {
        let config = IngestConfig {
            target: TargetDistribution::new([("easy", 0.9), ("hard", 0.9)]),
            ..IngestConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn malformed_settings_are_rejected() {
        let config = IngestConfig {
            target: TargetDistribution::new([("easy", -0.1)]),
            ..IngestConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFraction { .. })
        ));

        let config = IngestConfig {
            thresholds: StepsThresholds::new([("easy", StepsRange::new(10, 0))]),
            ..IngestConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedRange {
                bucket: DifficultyBucket::new("easy"),
                lo: 10,
                hi: 0,
            })
        );

        let config = IngestConfig {
            thresholds: StepsThresholds::new(Vec::<(&str, StepsRange)>::new()),
            ..IngestConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyThresholds));

        let config = IngestConfig {
            batch_multiplier: 0,
            ..IngestConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchMultiplier));
    }
}
