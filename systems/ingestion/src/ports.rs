//! Seams between the orchestrator and the outside world.

use std::error::Error as StdError;

use sortwater_core::{ContentId, DistributionStats, Level, NewLevel, ProposedLevel};

/// Source of candidate levels, typically a generative model.
///
/// Implementations may return fewer than `count` items and need not be
/// deterministic. An empty batch signals that the proposer has nothing more.
pub trait Proposer {
    /// Failure reported by a proposer call.
    type Error: StdError + Send + Sync + 'static;

    /// Requests up to `count` candidates from the model named `model`.
    fn propose(&mut self, model: &str, count: usize) -> Result<Vec<ProposedLevel>, Self::Error>;
}

/// Durable level storage consulted and extended by the orchestrator.
pub trait LevelStore {
    /// Failure reported by a store call.
    type Error: StdError + Send + Sync + 'static;

    /// Number of stored levels.
    fn total_count(&self) -> Result<u64, Self::Error>;

    /// Per-bucket counts over the `window` most recently inserted levels.
    fn window_stats(&self, window: u64) -> Result<DistributionStats, Self::Error>;

    /// Fingerprints of every stored level.
    fn all_fingerprints(&self) -> Result<Vec<ContentId>, Self::Error>;

    /// Commits one level. The level is durable once this returns.
    fn insert_level(&mut self, level: NewLevel) -> Result<Level, Self::Error>;
}

impl<P: Proposer + ?Sized> Proposer for &mut P {
    type Error = P::Error;

    fn propose(&mut self, model: &str, count: usize) -> Result<Vec<ProposedLevel>, Self::Error> {
        (**self).propose(model, count)
    }
}

impl<S: LevelStore + ?Sized> LevelStore for &mut S {
    type Error = S::Error;

    fn total_count(&self) -> Result<u64, Self::Error> {
        (**self).total_count()
    }

    fn window_stats(&self, window: u64) -> Result<DistributionStats, Self::Error> {
        (**self).window_stats(window)
    }

    fn all_fingerprints(&self) -> Result<Vec<ContentId>, Self::Error> {
        (**self).all_fingerprints()
    }

    fn insert_level(&mut self, level: NewLevel) -> Result<Level, Self::Error> {
        (**self).insert_level(level)
    }
}
