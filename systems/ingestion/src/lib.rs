#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ingestion orchestrator that curates proposer output into the level store.
//!
//! A run requests candidate batches from a [`Proposer`], fingerprints and
//! classifies every candidate, and commits them one by one through a
//! [`LevelStore`] while steering the windowed difficulty mix toward the
//! configured target. Each commit is durable before the next selection starts.

pub mod config;
pub mod ports;
pub mod report;

use std::error::Error as StdError;

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sortwater_core::{Candidate, IngestEvent, NewLevel, ProposedLevel, RejectionReason};
use sortwater_system_balancer::{BalanceMode, Balancer, Selection};
use sortwater_system_classifier::classify;
use sortwater_system_fingerprint::{fingerprint, DedupIndex};
use sortwater_world::verify_solution;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use config::{ConfigError, IngestConfig};
pub use ports::{LevelStore, Proposer};
pub use report::{IngestReport, IngestStatus};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Fatal failures that abort a run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The configuration was rejected before any proposer call.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    /// Reading from the store failed; earlier commits remain durable.
    #[error("failed to read from the level store after {inserted} insertions")]
    Store {
        /// Levels committed before the failure.
        inserted: usize,
        /// Underlying store error.
        #[source]
        source: BoxError,
    },
    /// Committing a level failed; earlier commits remain durable.
    #[error("failed to persist a level after {inserted} insertions")]
    Persistence {
        /// Levels committed before the failure.
        inserted: usize,
        /// Underlying store error.
        #[source]
        source: BoxError,
    },
}

impl IngestError {
    fn store<E>(inserted: usize) -> impl FnOnce(E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        move |error| Self::Store {
            inserted,
            source: Box::new(error),
        }
    }
}

/// Drives one proposer and one store through ingestion runs.
#[derive(Debug)]
pub struct Ingestion<P, S> {
    config: IngestConfig,
    proposer: P,
    store: S,
}

impl<P: Proposer, S: LevelStore> Ingestion<P, S> {
    /// Bundles the collaborators of a run.
    pub fn new(config: IngestConfig, proposer: P, store: S) -> Self {
        Self {
            config,
            proposer,
            store,
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Store the run commits into.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Releases the proposer and the store.
    pub fn into_parts(self) -> (P, S) {
        (self.proposer, self.store)
    }

    /// Inserts up to `target` levels proposed by `model`.
    ///
    /// Progress is reported through `out`. Proposer failures and empty batches
    /// end the run early with a partial or failed report; store failures abort
    /// with an error.
    pub fn run(
        &mut self,
        model: &str,
        target: usize,
        out: &mut Vec<IngestEvent>,
    ) -> Result<IngestReport, IngestError> {
        self.config.validate()?;

        let persisted = self.store.all_fingerprints().map_err(IngestError::store(0))?;
        let mut dedup = DedupIndex::from_persisted(persisted);
        debug!(known = dedup.persisted_len(), "loaded persisted fingerprints");

        let seed = self.config.shuffle_seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let balancer = Balancer::new(self.config.target.clone());
        let requested = self.config.batch_multiplier.saturating_mul(target);

        let mut report = IngestReport::new(target);
        let mut pool: Vec<Candidate> = Vec::new();

        while report.inserted < target && report.attempts < self.config.max_attempts {
            if pool.is_empty() {
                report.attempts += 1;
                let attempt = report.attempts;
                out.push(IngestEvent::BatchRequested { attempt, requested });
                info!(model, attempt, requested, "requesting candidate batch");

                let batch = match self.proposer.propose(model, requested) {
                    Ok(batch) => batch,
                    Err(error) => {
                        warn!(model, attempt, %error, "proposer request failed");
                        out.push(IngestEvent::ProposerFailed {
                            attempt,
                            message: error.to_string(),
                        });
                        continue;
                    }
                };

                if batch.is_empty() {
                    warn!(model, attempt, "proposer returned an empty batch");
                    out.push(IngestEvent::ProposerExhausted { attempt });
                    report.proposer_exhausted = true;
                    break;
                }

                pool = admit(&self.config, batch, &mut report, out);
                pool.shuffle(&mut rng);
                if pool.is_empty() {
                    continue;
                }
            }

            let total = self
                .store
                .total_count()
                .map_err(IngestError::store(report.inserted))?;
            let window = self.config.window;
            let store = &self.store;
            let mode = BalanceMode::for_store(total, window, || store.window_stats(window))
                .map_err(IngestError::store(report.inserted))?;

            let Selection { chosen, duplicates } =
                balancer.select(&pool, &mode, |id| dedup.contains(id));

            report.duplicates += duplicates.len();
            for &index in &duplicates {
                let fingerprint = pool[index].fingerprint;
                debug!(%fingerprint, "dropping duplicate candidate");
                out.push(IngestEvent::CandidateRejected {
                    fingerprint,
                    reason: RejectionReason::Duplicate,
                });
            }

            let Some(choice) = chosen else {
                debug!(remaining = pool.len(), "no selectable candidate, discarding pool");
                out.push(IngestEvent::PoolDiscarded {
                    remaining: pool.len(),
                });
                pool.clear();
                continue;
            };

            let shift = duplicates.iter().filter(|index| **index < choice.index).count();
            for &index in duplicates.iter().rev() {
                let _ = pool.remove(index);
            }
            let candidate = pool.remove(choice.index - shift);
            let fingerprint = candidate.fingerprint;

            let level = self
                .store
                .insert_level(NewLevel::from_candidate(candidate, model))
                .map_err(|error| IngestError::Persistence {
                    inserted: report.inserted,
                    source: Box::new(error),
                })?;

            dedup.record_accepted(fingerprint);
            report.record_insert(&level.difficulty);

            match choice.delta {
                Some(delta) => info!(
                    id = %level.id,
                    inserted = report.inserted,
                    difficulty = %level.difficulty,
                    steps = level.steps_to_solve,
                    delta,
                    "inserted level"
                ),
                None => info!(
                    id = %level.id,
                    inserted = report.inserted,
                    difficulty = %level.difficulty,
                    steps = level.steps_to_solve,
                    "inserted level in bootstrap mode"
                ),
            }

            out.push(IngestEvent::LevelInserted {
                id: level.id,
                difficulty: level.difficulty,
                steps_to_solve: level.steps_to_solve,
                mode: mode.kind(),
                delta: choice.delta,
            });
        }

        match report.status() {
            IngestStatus::Complete => info!(
                model,
                inserted = report.inserted,
                attempts = report.attempts,
                "ingestion complete"
            ),
            status => warn!(
                model,
                ?status,
                inserted = report.inserted,
                requested = report.requested,
                attempts = report.attempts,
                "ingestion stopped short of the requested count"
            ),
        }

        Ok(report)
    }
}

/// Fingerprints, verifies and classifies a fresh batch into pool candidates.
fn admit(
    config: &IngestConfig,
    batch: Vec<ProposedLevel>,
    report: &mut IngestReport,
    out: &mut Vec<IngestEvent>,
) -> Vec<Candidate> {
    let mut pool = Vec::with_capacity(batch.len());

    for proposal in batch {
        let fingerprint = fingerprint(&proposal.state);

        if config.verify_solutions {
            if let Some(solution) = &proposal.solution {
                if let Err(error) = verify_solution(&proposal.state, solution) {
                    debug!(%fingerprint, %error, "rejecting candidate with invalid solution");
                    report.invalid += 1;
                    out.push(IngestEvent::CandidateRejected {
                        fingerprint,
                        reason: RejectionReason::InvalidSolution {
                            failed_move: error.failed_move(),
                        },
                    });
                    continue;
                }
            }
        }

        let difficulty = classify(proposal.steps_to_solve, &config.thresholds);
        pool.push(Candidate {
            proposal,
            difficulty,
            fingerprint,
        });
    }

    pool
}
