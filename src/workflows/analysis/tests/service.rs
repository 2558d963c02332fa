use std::sync::Arc;

use super::common::*;

use crate::workflows::analysis::domain::{RunId, RunStatus};
use crate::workflows::analysis::pipeline::{PipelineError, StageError};
use crate::workflows::analysis::repository::{RepositoryError, RunRepository};
use crate::workflows::analysis::results::ResultQuery;
use crate::workflows::analysis::scoring::Classification;
use crate::workflows::analysis::service::{AnalysisService, AnalysisServiceError};

#[tokio::test]
async fn submit_stores_the_run_and_drives_it_to_completion() {
    let (service, repository) = build_service(evidence_backend());

    let view = service
        .submit("genome.fasta", GENOME)
        .expect("submission accepted");
    assert_eq!(view.status, RunStatus::Running);
    assert_eq!(view.input.contigs, 2);

    let run = wait_for_terminal(&repository, &view.run_id).await;
    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(run.stage_log().len(), 6);

    let status = service.status(&view.run_id).expect("status available");
    assert_eq!(status.progress_percent, 100);
}

#[tokio::test]
async fn submit_rejects_invalid_input_without_creating_a_run() {
    let (service, repository) = build_service(evidence_backend());

    let error = service
        .submit("genome.fasta", "")
        .expect_err("empty file rejected");
    assert!(matches!(
        error,
        AnalysisServiceError::Pipeline(PipelineError::InvalidInput(_))
    ));
    assert!(repository.runs.lock().expect("repository mutex").is_empty());
}

#[tokio::test]
async fn submit_surfaces_repository_failures() {
    let service = Arc::new(AnalysisService::new(
        Arc::new(evidence_backend()),
        Arc::new(UnavailableRepository),
        &settings(),
    ));

    let error = service
        .submit("genome.fasta", GENOME)
        .expect_err("repository offline");
    assert!(matches!(
        error,
        AnalysisServiceError::Repository(RepositoryError::Unavailable(_))
    ));
}

#[tokio::test]
async fn analyze_runs_inline_and_returns_results() {
    let (service, repository) = build_service(evidence_backend());
    let observer = RecordingObserver::default();

    let run = service
        .analyze("genome.fa", GENOME, &observer)
        .await
        .expect("analysis completes");

    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(observer.progress().last(), Some(&100));
    let stored = repository
        .fetch(run.id())
        .expect("fetch succeeds")
        .expect("run stored");
    assert_eq!(stored.status(), RunStatus::Completed);

    let page = service
        .results(run.id(), &ResultQuery::default())
        .expect("results available");
    assert_eq!(page.rows.len(), 5);
    assert_eq!(page.summary.count(Classification::LowConfidence), 2);
}

#[tokio::test]
async fn analyze_reports_fatal_extraction() {
    let backend = StubBackend {
        extraction: Reply::Fail(StageError::Transport("orf service down".to_string())),
        ..StubBackend::default()
    };
    let (service, repository) = build_service(backend);

    let error = service
        .analyze("genome.fa", GENOME, &RecordingObserver::default())
        .await
        .expect_err("fatal extraction");
    assert!(matches!(
        error,
        AnalysisServiceError::Pipeline(PipelineError::FatalExtraction(_))
    ));

    let runs = repository.runs.lock().expect("repository mutex");
    let stored = runs.values().next().expect("failed run is kept");
    assert_eq!(stored.status(), RunStatus::Failed);
}

#[tokio::test]
async fn results_are_refused_until_the_run_finishes() {
    let mut backend = evidence_backend();
    backend.ml = Reply::Hang;
    let (service, _) = build_service(backend);

    let view = service.submit("genome.fasta", GENOME).expect("accepted");
    let error = service
        .results(&view.run_id, &ResultQuery::default())
        .expect_err("still running");
    assert!(matches!(error, AnalysisServiceError::RunNotFinished(_)));
}

#[tokio::test]
async fn cancel_stops_a_running_analysis() {
    let mut backend = evidence_backend();
    backend.homology = Reply::Hang;
    let (service, repository) = build_service(backend);

    let view = service.submit("genome.fasta", GENOME).expect("accepted");
    service.cancel(&view.run_id).expect("cancel accepted");

    let run = wait_for_terminal(&repository, &view.run_id).await;
    assert_eq!(run.status(), RunStatus::Cancelled);
    assert!(run.candidates().is_empty());

    let error = service
        .export_csv(&view.run_id)
        .expect_err("cancelled runs have no results");
    assert!(matches!(
        error,
        AnalysisServiceError::NoResults {
            status: RunStatus::Cancelled,
            ..
        }
    ));

    let error = service
        .cancel(&view.run_id)
        .expect_err("already finished");
    assert!(matches!(
        error,
        AnalysisServiceError::Pipeline(PipelineError::RunFinalized(_))
    ));
}

#[tokio::test]
async fn export_covers_every_candidate() {
    let (service, _) = build_service(evidence_backend());
    let run = service
        .analyze("genome.fasta", GENOME, &RecordingObserver::default())
        .await
        .expect("analysis completes");

    let csv = service.export_csv(run.id()).expect("export renders");
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.starts_with("ORF_ID,VF_Score,Classification"));
}

#[tokio::test]
async fn unknown_runs_are_not_found() {
    let (service, _) = build_service(evidence_backend());
    let error = service
        .status(&RunId("run-missing".to_string()))
        .expect_err("unknown run");
    assert!(matches!(
        error,
        AnalysisServiceError::Repository(RepositoryError::NotFound)
    ));
}
