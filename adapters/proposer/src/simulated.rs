use std::str::FromStr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sortwater_core::ProposedLevel;
use sortwater_system_ingestion::Proposer;
use sortwater_system_walker::{WalkConfig, Walker};
use sortwater_world::{generate_unsolved_state, BoardShape, ShapeError};
use thiserror::Error;
use tracing::debug;

/// Boards generated per requested candidate before a batch is returned short.
const BOARDS_PER_CANDIDATE: usize = 4;

/// Upper bound on the candidates returned by a single request.
const MAX_BATCH_LEN: usize = 1024;

/// Board dimensions encoded in a model identifier of the form `N_K_L`.
///
/// `N` is the tube count, `K` the number of empty tubes and `L` the number of
/// layers per tube.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    /// Total tubes.
    pub tubes: usize,
    /// Tubes that start empty.
    pub empty: usize,
    /// Layers per tube.
    pub layers: usize,
}

impl ModelSpec {
    /// Board shape described by the identifier.
    pub fn shape(&self) -> Result<BoardShape, ModelIdError> {
        Ok(BoardShape::new(self.tubes, self.empty, self.layers)?)
    }
}

impl FromStr for ModelSpec {
    type Err = ModelIdError;

    fn from_str(model: &str) -> Result<Self, Self::Err> {
        let malformed = || ModelIdError::Malformed {
            model: model.to_owned(),
        };
        let parts: Vec<&str> = model.trim().split('_').collect();
        let [tubes, empty, layers] = parts.as_slice() else {
            return Err(malformed());
        };
        let parse = |part: &str| part.parse::<usize>().map_err(|_| malformed());
        Ok(Self {
            tubes: parse(*tubes)?,
            empty: parse(*empty)?,
            layers: parse(*layers)?,
        })
    }
}

/// Reasons a model identifier cannot drive the simulated proposer.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ModelIdError {
    /// The identifier is not three underscore-separated integers.
    #[error("model identifier `{model}` is not of the form N_K_L")]
    Malformed {
        /// Offending identifier.
        model: String,
    },
    /// The identifier describes an impossible board.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Proposer that generates random boards and solves them with random walks.
///
/// Only boards for which a walk finds a solution are returned; their
/// steps-to-solve is the length of the shortest walk found. A single request
/// yields at most 1024 candidates.
#[derive(Debug)]
pub struct SimulatedProposer {
    walker: Walker<ChaCha8Rng>,
}

impl SimulatedProposer {
    /// Creates a proposer seeded with `seed`.
    #[must_use]
    pub fn new(config: WalkConfig, seed: u64) -> Self {
        Self {
            walker: Walker::new(config, ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Creates a proposer seeded from entropy.
    #[must_use]
    pub fn from_entropy(config: WalkConfig) -> Self {
        Self::new(config, rand::random())
    }
}

impl Proposer for SimulatedProposer {
    type Error = ModelIdError;

    fn propose(&mut self, model: &str, count: usize) -> Result<Vec<ProposedLevel>, Self::Error> {
        let shape = model.parse::<ModelSpec>()?.shape()?;
        let wanted = count.min(MAX_BATCH_LEN);
        let mut batch = Vec::with_capacity(wanted);
        let mut generated = 0;

        while batch.len() < wanted && generated < wanted * BOARDS_PER_CANDIDATE {
            generated += 1;
            let board = generate_unsolved_state(shape, self.walker.rng_mut())?;
            if board.degenerate {
                continue;
            }
            let Some(solution) = self.walker.solve(&board.state) else {
                continue;
            };
            batch.push(ProposedLevel {
                state: board.state,
                steps_to_solve: i32::try_from(solution.len()).unwrap_or(i32::MAX),
                solution: Some(solution),
            });
        }

        debug!(model, requested = count, generated, solved = batch.len(), "simulated batch ready");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_identifiers_parse() {
        let spec: ModelSpec = "5_2_4".parse().expect("valid identifier");
        assert_eq!(
            spec,
            ModelSpec {
                tubes: 5,
                empty: 2,
                layers: 4
            }
        );
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        for model in ["", "5_2", "5_2_4_1", "five_2_4", "5_-2_4"] {
            assert_eq!(
                model.parse::<ModelSpec>(),
                Err(ModelIdError::Malformed {
                    model: model.to_owned()
                })
            );
        }
    }

    #[test]
    fn impossible_shapes_are_proposer_errors() {
        let mut proposer = SimulatedProposer::new(WalkConfig::default(), 5);
        assert_eq!(
            proposer.propose("3_4_2", 1),
            Err(ModelIdError::Shape(ShapeError::TooManyEmpty { tubes: 3, empty: 4 }))
        );
    }

    #[test]
    fn oversized_requests_are_capped() {
        let mut proposer = SimulatedProposer::new(WalkConfig::new(5, 1), 1);
        let batch = proposer
            .propose("3_1_2", usize::MAX / 3)
            .expect("simulated batch");
        assert!(batch.len() <= MAX_BATCH_LEN);
    }
}
