use super::domain::RunId;
use super::run::AnalysisRun;

/// Storage abstraction for run snapshots so the service can be exercised in
/// isolation. Implementations store clones; the orchestrator keeps the
/// authoritative copy while a run is being driven.
pub trait RunRepository: Send + Sync {
    fn insert(&self, run: AnalysisRun) -> Result<AnalysisRun, RepositoryError>;
    fn update(&self, run: AnalysisRun) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &RunId) -> Result<Option<AnalysisRun>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("run already exists")]
    Conflict,
    #[error("run not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
