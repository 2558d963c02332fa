use super::super::blueprint::PipelineBlueprint;
use super::super::domain::{
    AnalysisStage, BlastHit, CandidateId, EvidenceBundle, Reading, RunStatus, StageOutcome,
};
use super::super::results::ResultSet;
use super::super::run::{AnalysisRun, StageRecord};
use super::super::scoring::ScoringEngine;
use super::backend::{AnalysisBackend, StageError};
use super::progress::{CancellationHandle, ProgressEvent, ProgressObserver};
use super::PipelineError;
use crate::config::PipelineSettings;
use crate::workflows::fasta::SequenceInput;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives an `AnalysisRun` through the fixed stage sequence, one stage per
/// `advance` call, merging each stage's evidence before the next call starts.
#[derive(Debug)]
pub struct PipelineOrchestrator<B> {
    backend: Arc<B>,
    engine: ScoringEngine,
    blueprint: PipelineBlueprint,
    stage_timeout: Duration,
    stage_retries: u32,
}

impl<B> PipelineOrchestrator<B>
where
    B: AnalysisBackend + 'static,
{
    pub fn new(backend: Arc<B>, settings: &PipelineSettings) -> Self {
        Self {
            backend,
            engine: ScoringEngine::for_profile(settings.scoring_profile),
            blueprint: PipelineBlueprint::standard(),
            stage_timeout: settings.stage_timeout,
            stage_retries: settings.stage_retries,
        }
    }

    pub fn with_engine(mut self, engine: ScoringEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Create a run for validated input. Nothing is called yet.
    pub fn start(&self, input: SequenceInput) -> AnalysisRun {
        let run = AnalysisRun::new(input);
        info!(
            run_id = %run.id(),
            filename = run.input().filename(),
            contigs = run.input().records().len(),
            "analysis run created"
        );
        run
    }

    /// Validate raw file content and create a run; malformed input never
    /// reaches the first stage.
    pub fn prepare(&self, filename: &str, content: &str) -> Result<AnalysisRun, PipelineError> {
        let input = SequenceInput::parse(filename, content)?;
        Ok(self.start(input))
    }

    /// Advance until the run reaches a terminal status.
    pub async fn run(
        &self,
        run: &mut AnalysisRun,
        cancel: &CancellationHandle,
        observer: &dyn ProgressObserver,
    ) -> Result<RunStatus, PipelineError> {
        loop {
            let status = self.advance(run, cancel, observer).await?;
            if status.is_terminal() {
                return Ok(status);
            }
        }
    }

    /// Execute exactly one stage. Cancellation is only observed here, before
    /// the stage call is issued.
    pub async fn advance(
        &self,
        run: &mut AnalysisRun,
        cancel: &CancellationHandle,
        observer: &dyn ProgressObserver,
    ) -> Result<RunStatus, PipelineError> {
        let stage = match run.pending_stage() {
            Some(stage) if !run.status().is_terminal() => stage,
            _ => return Err(PipelineError::RunFinalized(run.id().clone())),
        };

        if cancel.is_cancelled() {
            run.cancel()?;
            info!(run_id = %run.id(), %stage, "analysis run cancelled at stage boundary");
            self.emit(run, observer);
            return Err(PipelineError::Cancelled);
        }

        let checkpoint = self.blueprint.checkpoint(stage);
        run.begin_stage(stage, checkpoint.started)?;
        self.emit(run, observer);
        let started_at = Utc::now();
        let backend = &*self.backend;

        let (outcome, attempts) = match stage {
            AnalysisStage::ExtractCandidates => {
                let input = run.shared_input();
                let (result, attempts) = self
                    .call_stage(stage, || backend.extract_candidates(&input))
                    .await;
                let installed = match result {
                    Ok(candidates) => run.install_candidates(candidates),
                    Err(err) => Err(PipelineError::FatalExtraction(err.to_string())),
                };
                match installed {
                    Ok(()) => (StageOutcome::Completed, attempts),
                    Err(PipelineError::FatalExtraction(reason)) => {
                        return self.abort(run, stage, started_at, attempts, reason, observer);
                    }
                    Err(other) => return Err(other),
                }
            }
            AnalysisStage::ScoreMl => {
                let candidates = run.candidates().to_vec();
                let (result, attempts) = self
                    .call_stage(stage, || backend.score_ml(&candidates))
                    .await;
                let outcome = merge_readings(
                    run,
                    stage,
                    result,
                    ml_slot,
                    check_probability,
                    missing_reading,
                )?;
                (outcome, attempts)
            }
            AnalysisStage::SearchHomology => {
                let candidates = run.candidates().to_vec();
                let (result, attempts) = self
                    .call_stage(stage, || backend.search_homology(&candidates))
                    .await;
                let outcome = merge_readings(
                    run,
                    stage,
                    result,
                    homology_slot,
                    check_hit,
                    no_significant_hit,
                )?;
                (outcome, attempts)
            }
            AnalysisStage::SearchDomains => {
                let candidates = run.candidates().to_vec();
                let (result, attempts) = self
                    .call_stage(stage, || backend.search_domains(&candidates))
                    .await;
                let outcome = merge_readings(
                    run,
                    stage,
                    result,
                    domain_slot,
                    accept_flag,
                    missing_reading,
                )?;
                (outcome, attempts)
            }
            AnalysisStage::DetectSignal => {
                let candidates = run.candidates().to_vec();
                let (result, attempts) = self
                    .call_stage(stage, || backend.detect_signal(&candidates))
                    .await;
                let outcome = merge_readings(
                    run,
                    stage,
                    result,
                    signal_slot,
                    accept_flag,
                    missing_reading,
                )?;
                (outcome, attempts)
            }
            AnalysisStage::Aggregate => {
                let scored = run
                    .evidence_entries()
                    .map(|(candidate, evidence)| {
                        self.engine.score(candidate.clone(), evidence.clone())
                    })
                    .collect();
                let results = ResultSet::new(run.id().clone(), scored);
                let record = stage_record(stage, StageOutcome::Completed, 1, started_at);
                run.finish_stage(record, checkpoint.completed)?;
                self.emit(run, observer);

                run.complete(results)?;
                info!(
                    run_id = %run.id(),
                    candidates = run.candidates().len(),
                    "analysis run completed"
                );
                self.emit(run, observer);
                return Ok(run.status());
            }
        };

        match &outcome {
            StageOutcome::Degraded { reason } => {
                warn!(run_id = %run.id(), %stage, %reason, attempts, "stage degraded");
            }
            _ => info!(run_id = %run.id(), %stage, attempts, "stage completed"),
        }

        let record = stage_record(stage, outcome, attempts, started_at);
        run.finish_stage(record, checkpoint.completed)?;
        self.emit(run, observer);
        Ok(run.status())
    }

    async fn call_stage<T, F, Fut>(
        &self,
        stage: AnalysisStage,
        call: F,
    ) -> (Result<T, StageError>, u32)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = match tokio::time::timeout(self.stage_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(StageError::Timeout(self.stage_timeout)),
            };

            match result {
                Err(err) if err.is_retryable() && attempts <= self.stage_retries => {
                    warn!(%stage, attempt = attempts, error = %err, "stage call failed, retrying");
                }
                other => return (other, attempts),
            }
        }
    }

    fn abort(
        &self,
        run: &mut AnalysisRun,
        stage: AnalysisStage,
        started_at: DateTime<Utc>,
        attempts: u32,
        reason: String,
        observer: &dyn ProgressObserver,
    ) -> Result<RunStatus, PipelineError> {
        error!(run_id = %run.id(), %stage, %reason, attempts, "analysis run failed");
        let outcome = StageOutcome::Failed {
            reason: reason.clone(),
        };
        let progress = run.progress_percent();
        run.finish_stage(stage_record(stage, outcome, attempts, started_at), progress)?;
        run.fail(reason.clone())?;
        self.emit(run, observer);
        Err(PipelineError::FatalExtraction(reason))
    }

    fn emit(&self, run: &AnalysisRun, observer: &dyn ProgressObserver) {
        let event = ProgressEvent {
            run_id: run.id().clone(),
            stage: run.stage(),
            stage_label: run.stage().label(),
            description: run.stage().description(),
            progress_percent: run.progress_percent(),
            status: run.status(),
            emitted_at: Utc::now(),
        };
        debug!(
            run_id = %event.run_id,
            stage = event.stage_label,
            progress = event.progress_percent,
            status = event.status.label(),
            "pipeline progress"
        );
        observer.on_progress(&event);
    }
}

fn stage_record(
    stage: AnalysisStage,
    outcome: StageOutcome,
    attempts: u32,
    started_at: DateTime<Utc>,
) -> StageRecord {
    StageRecord {
        stage,
        outcome,
        attempts,
        started_at,
        finished_at: Utc::now(),
    }
}

fn merge_readings<T>(
    run: &mut AnalysisRun,
    stage: AnalysisStage,
    result: Result<HashMap<CandidateId, T>, StageError>,
    slot: fn(&mut EvidenceBundle) -> &mut Reading<T>,
    check: fn(&T) -> Result<(), String>,
    missing: fn() -> Reading<T>,
) -> Result<StageOutcome, PipelineError> {
    // An empty map only means "no data" where an omitted candidate would be
    // unavailable. For homology it is a batch without significant hits.
    let absence_is_unavailable = matches!(missing(), Reading::Unavailable(_));
    let mut readings = match result {
        Ok(readings)
            if readings.is_empty() && absence_is_unavailable && !run.candidates().is_empty() =>
        {
            return degrade(run, slot, "stage returned no data".to_string());
        }
        Ok(readings) => readings,
        Err(err) => return degrade(run, slot, err.to_string()),
    };

    let run_id = run.id().clone();
    let mut rejected = 0usize;
    for (candidate, bundle) in run.evidence_entries_mut()? {
        let reading = match readings.remove(&candidate.id) {
            Some(value) => match check(&value) {
                Ok(()) => Reading::Observed(value),
                Err(reason) => {
                    rejected += 1;
                    Reading::Unavailable(reason)
                }
            },
            None => missing(),
        };
        *slot(bundle) = reading;
    }

    if rejected > 0 {
        warn!(run_id = %run_id, %stage, rejected, "discarded invalid readings");
    }
    if !readings.is_empty() {
        warn!(
            run_id = %run_id,
            %stage,
            unknown = readings.len(),
            "ignored readings for unknown candidates"
        );
    }

    Ok(StageOutcome::Completed)
}

fn degrade<T>(
    run: &mut AnalysisRun,
    slot: fn(&mut EvidenceBundle) -> &mut Reading<T>,
    reason: String,
) -> Result<StageOutcome, PipelineError> {
    for (_, bundle) in run.evidence_entries_mut()? {
        *slot(bundle) = Reading::Unavailable(reason.clone());
    }
    Ok(StageOutcome::Degraded { reason })
}

fn ml_slot(bundle: &mut EvidenceBundle) -> &mut Reading<f64> {
    &mut bundle.ml_probability
}

fn homology_slot(bundle: &mut EvidenceBundle) -> &mut Reading<Option<BlastHit>> {
    &mut bundle.blast_hit
}

fn domain_slot(bundle: &mut EvidenceBundle) -> &mut Reading<bool> {
    &mut bundle.hmm_hit
}

fn signal_slot(bundle: &mut EvidenceBundle) -> &mut Reading<bool> {
    &mut bundle.signal_peptide
}

fn check_probability(value: &f64) -> Result<(), String> {
    if value.is_finite() && (0.0..=1.0).contains(value) {
        Ok(())
    } else {
        Err(format!("probability {value} outside [0, 1]"))
    }
}

fn check_hit(hit: &Option<BlastHit>) -> Result<(), String> {
    match hit {
        Some(hit) if !(hit.identity_percent.is_finite()
            && (0.0..=100.0).contains(&hit.identity_percent)) =>
        {
            Err(format!("identity {} outside [0, 100]", hit.identity_percent))
        }
        Some(hit) if !(hit.evalue.is_finite() && hit.evalue > 0.0) => {
            Err(format!("e-value {} is not a positive number", hit.evalue))
        }
        _ => Ok(()),
    }
}

fn accept_flag(_: &bool) -> Result<(), String> {
    Ok(())
}

fn missing_reading<T>() -> Reading<T> {
    Reading::Unavailable("no reading returned for candidate".to_string())
}

fn no_significant_hit() -> Reading<Option<BlastHit>> {
    Reading::Observed(None)
}
