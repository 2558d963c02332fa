//! Virulence-factor analysis: the staged pipeline, the scoring engine and the
//! result-set views built over a completed run.

pub mod blueprint;
pub mod domain;
pub mod pipeline;
pub mod repository;
pub mod results;
pub mod router;
pub mod run;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use blueprint::{PipelineBlueprint, StageCheckpoint};
pub use domain::{
    AnalysisStage, BlastHit, Candidate, CandidateId, EvidenceBundle, EvidenceKind, Reading,
    RunId, RunStatus, StageOutcome,
};
pub use pipeline::{
    AnalysisBackend, CancellationHandle, PipelineError, PipelineOrchestrator, ProgressEvent,
    ProgressObserver, StageError, TracingProgressObserver,
};
pub use repository::{RepositoryError, RunRepository};
pub use results::{
    ClassificationFilter, ExportError, FlatRecord, ResultPage, ResultQuery, ResultRow,
    ResultSet, ResultSummary, ResultView, SortDirection, SortKey,
};
pub use router::analysis_router;
pub use run::{AnalysisRun, RunStatusView, StageRecord};
pub use scoring::{
    Classification, HomologyTier, ScoreCard, ScoreComponent, ScoredCandidate, ScoringConfig,
    ScoringEngine, ScoringProfile,
};
pub use service::{AnalysisService, AnalysisServiceError};
