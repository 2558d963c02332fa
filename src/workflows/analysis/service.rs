use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, warn};

use super::domain::{RunId, RunStatus};
use super::pipeline::{
    AnalysisBackend, CancellationHandle, PipelineError, PipelineOrchestrator, ProgressObserver,
    TracingProgressObserver,
};
use super::repository::{RepositoryError, RunRepository};
use super::results::{ExportError, ResultPage, ResultQuery, ResultSet};
use super::run::{AnalysisRun, RunStatusView};
use crate::config::PipelineSettings;

/// Service composing the orchestrator, run storage and per-run cancellation.
pub struct AnalysisService<B, R> {
    orchestrator: Arc<PipelineOrchestrator<B>>,
    repository: Arc<R>,
    active: Mutex<HashMap<RunId, CancellationHandle>>,
}

impl<B, R> AnalysisService<B, R>
where
    B: AnalysisBackend + 'static,
    R: RunRepository + 'static,
{
    pub fn new(backend: Arc<B>, repository: Arc<R>, settings: &PipelineSettings) -> Self {
        let orchestrator = PipelineOrchestrator::new(backend, settings);
        Self::with_orchestrator(orchestrator, repository)
    }

    pub fn with_orchestrator(orchestrator: PipelineOrchestrator<B>, repository: Arc<R>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            repository,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn orchestrator(&self) -> &PipelineOrchestrator<B> {
        &self.orchestrator
    }

    /// Validate the upload, register the run and drive it in the background.
    /// Input errors are returned before any run exists.
    pub fn submit(
        self: &Arc<Self>,
        filename: &str,
        fasta: &str,
    ) -> Result<RunStatusView, AnalysisServiceError> {
        let run = self.orchestrator.prepare(filename, fasta)?;
        let stored = self.repository.insert(run)?;
        let view = stored.status_view();

        let cancel = CancellationHandle::new();
        self.track(stored.id().clone(), cancel.clone());

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.drive(stored, cancel).await;
        });

        Ok(view)
    }

    /// Run the whole pipeline on the current task, reporting to `observer`.
    pub async fn analyze(
        &self,
        filename: &str,
        fasta: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisRun, AnalysisServiceError> {
        let run = self.orchestrator.prepare(filename, fasta)?;
        let mut run = self.repository.insert(run)?;
        let cancel = CancellationHandle::new();

        let outcome = self.orchestrator.run(&mut run, &cancel, observer).await;
        self.repository.update(run.clone())?;
        outcome?;
        Ok(run)
    }

    /// Request cancellation. Takes effect at the next stage boundary.
    pub fn cancel(&self, id: &RunId) -> Result<RunStatusView, AnalysisServiceError> {
        let run = self.fetch(id)?;
        if run.status().is_terminal() {
            return Err(PipelineError::RunFinalized(id.clone()).into());
        }

        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.get(id) {
            Some(handle) => {
                handle.cancel();
                info!(run_id = %id, "cancellation requested");
            }
            None => warn!(run_id = %id, "cancellation requested for a run with no driver"),
        }
        Ok(run.status_view())
    }

    pub fn status(&self, id: &RunId) -> Result<RunStatusView, AnalysisServiceError> {
        Ok(self.fetch(id)?.status_view())
    }

    pub fn results(
        &self,
        id: &RunId,
        query: &ResultQuery,
    ) -> Result<ResultPage, AnalysisServiceError> {
        Ok(self.finished_results(id)?.page(query))
    }

    pub fn export_csv(&self, id: &RunId) -> Result<String, AnalysisServiceError> {
        Ok(self.finished_results(id)?.to_csv_string()?)
    }

    fn fetch(&self, id: &RunId) -> Result<AnalysisRun, AnalysisServiceError> {
        let run = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(run)
    }

    fn finished_results(&self, id: &RunId) -> Result<ResultSet, AnalysisServiceError> {
        let run = self.fetch(id)?;
        match (run.status(), run.results()) {
            (_, Some(results)) => Ok(results.clone()),
            (RunStatus::Running, None) => Err(AnalysisServiceError::RunNotFinished(id.clone())),
            (status, None) => Err(AnalysisServiceError::NoResults {
                run_id: id.clone(),
                status,
            }),
        }
    }

    async fn drive(&self, mut run: AnalysisRun, cancel: CancellationHandle) {
        let observer = TracingProgressObserver;
        loop {
            let step = self.orchestrator.advance(&mut run, &cancel, &observer).await;
            if let Err(err) = self.repository.update(run.clone()) {
                warn!(run_id = %run.id(), error = %err, "failed to persist run snapshot");
            }

            match step {
                Ok(status) if !status.is_terminal() => {}
                Ok(_) | Err(PipelineError::Cancelled) | Err(PipelineError::FatalExtraction(_)) => {
                    break
                }
                Err(err) => {
                    error!(run_id = %run.id(), error = %err, "pipeline driver stopped");
                    break;
                }
            }
        }
        self.untrack(run.id());
    }

    fn track(&self, id: RunId, handle: CancellationHandle) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handle);
    }

    fn untrack(&self, id: &RunId) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

/// Error raised by the analysis service.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisServiceError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("analysis run {0} is still running")]
    RunNotFinished(RunId),
    #[error("analysis run {run_id} ended as {} without results", status.label())]
    NoResults { run_id: RunId, status: RunStatus },
    #[error(transparent)]
    Export(#[from] ExportError),
}
