#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level proposers that feed the ingestion pipeline.

mod candidate_file;
mod simulated;

pub use candidate_file::{CandidateFileError, CandidateFileProposer};
pub use simulated::{ModelIdError, ModelSpec, SimulatedProposer};
