mod backend;
mod orchestrator;
mod progress;

pub use backend::{AnalysisBackend, StageError};
pub use orchestrator::PipelineOrchestrator;
pub use progress::{
    CancellationHandle, ProgressEvent, ProgressObserver, TracingProgressObserver,
};

use super::domain::RunId;
use crate::workflows::fasta::InputError;

/// Failures that end a run or stop the caller before one exists.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("candidate extraction failed: {0}")]
    FatalExtraction(String),
    #[error("analysis run was cancelled")]
    Cancelled,
    #[error("analysis run {0} is no longer running")]
    RunFinalized(RunId),
}
