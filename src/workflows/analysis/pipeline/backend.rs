use super::super::domain::{BlastHit, Candidate, CandidateId};
use crate::workflows::fasta::SequenceInput;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Fault raised by an external analysis service call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("service rejected the request: {0}")]
    Rejected(String),
}

impl StageError {
    /// Rejections are deterministic, so retrying them is pointless.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StageError::Timeout(_) | StageError::Transport(_))
    }
}

/// External analysis services, one call per pipeline stage. Each evidence
/// call answers for the whole batch, keyed by candidate id.
pub trait AnalysisBackend: Send + Sync {
    fn extract_candidates(
        &self,
        input: &SequenceInput,
    ) -> impl Future<Output = Result<Vec<Candidate>, StageError>> + Send;

    fn score_ml(
        &self,
        candidates: &[Candidate],
    ) -> impl Future<Output = Result<HashMap<CandidateId, f64>, StageError>> + Send;

    /// A candidate missing from the map had no significant hit.
    fn search_homology(
        &self,
        candidates: &[Candidate],
    ) -> impl Future<Output = Result<HashMap<CandidateId, Option<BlastHit>>, StageError>> + Send;

    fn search_domains(
        &self,
        candidates: &[Candidate],
    ) -> impl Future<Output = Result<HashMap<CandidateId, bool>, StageError>> + Send;

    fn detect_signal(
        &self,
        candidates: &[Candidate],
    ) -> impl Future<Output = Result<HashMap<CandidateId, bool>, StageError>> + Send;
}
