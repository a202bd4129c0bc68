use std::{
    collections::VecDeque,
    convert::Infallible,
    fs,
    path::{Path, PathBuf},
};

use sortwater_core::ProposedLevel;
use sortwater_system_ingestion::Proposer;
use thiserror::Error;
use tracing::{debug, info};

/// Proposer that replays candidates exported by an external model.
///
/// The file holds a JSON array of proposals. Each request drains up to `count`
/// of them in file order; once the file is exhausted every request returns an
/// empty batch.
#[derive(Debug)]
pub struct CandidateFileProposer {
    path: PathBuf,
    pending: VecDeque<ProposedLevel>,
}

impl CandidateFileProposer {
    /// Loads every proposal from `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CandidateFileError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|source| CandidateFileError::Io {
            path: path.clone(),
            source,
        })?;
        let proposals: Vec<ProposedLevel> =
            serde_json::from_str(&raw).map_err(|source| CandidateFileError::Json {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), candidates = proposals.len(), "loaded candidate file");
        Ok(Self {
            path,
            pending: proposals.into(),
        })
    }

    /// Proposals not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Proposer for CandidateFileProposer {
    type Error = Infallible;

    fn propose(&mut self, _model: &str, count: usize) -> Result<Vec<ProposedLevel>, Self::Error> {
        let take = count.min(self.pending.len());
        let batch: Vec<ProposedLevel> = self.pending.drain(..take).collect();
        debug!(
            path = %self.path.display(),
            handed_out = batch.len(),
            remaining = self.pending.len(),
            "drained candidate file"
        );
        Ok(batch)
    }
}

/// Reasons a candidate file cannot be loaded.
#[derive(Debug, Error)]
pub enum CandidateFileError {
    /// The file could not be read.
    #[error("failed to read candidate file {}: {source}", path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON array of proposals.
    #[error("failed to parse candidate file {}: {source}", path.display())]
    Json {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}
