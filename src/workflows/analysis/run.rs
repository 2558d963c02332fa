use super::domain::{
    AnalysisStage, Candidate, CandidateId, EvidenceBundle, RunId, RunStatus, StageOutcome,
};
use super::pipeline::PipelineError;
use super::results::ResultSet;
use crate::workflows::fasta::{InputSummary, SequenceInput};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_run_id() -> RunId {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId(format!("run-{id:06}"))
}

/// One entry of the per-run stage log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage: AnalysisStage,
    #[serde(flatten)]
    pub outcome: StageOutcome,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Batch container driven through the stage sequence. Only the pipeline
/// orchestrator mutates it, and nothing changes once the status is terminal.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    id: RunId,
    input: Arc<SequenceInput>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    stage: AnalysisStage,
    pending: Option<AnalysisStage>,
    progress_percent: u8,
    status: RunStatus,
    failure: Option<String>,
    candidates: Vec<Candidate>,
    evidence: Vec<EvidenceBundle>,
    stage_log: Vec<StageRecord>,
    results: Option<ResultSet>,
}

impl AnalysisRun {
    pub(crate) fn new(input: SequenceInput) -> Self {
        let first = AnalysisStage::ordered()[0];
        Self {
            id: next_run_id(),
            input: Arc::new(input),
            created_at: Utc::now(),
            finished_at: None,
            stage: first,
            pending: Some(first),
            progress_percent: 0,
            status: RunStatus::Running,
            failure: None,
            candidates: Vec::new(),
            evidence: Vec::new(),
            stage_log: Vec::new(),
            results: None,
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn input(&self) -> &SequenceInput {
        &self.input
    }

    pub(crate) fn shared_input(&self) -> Arc<SequenceInput> {
        Arc::clone(&self.input)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn stage(&self) -> AnalysisStage {
        self.stage
    }

    /// Stage the next `advance` call will execute.
    pub fn pending_stage(&self) -> Option<AnalysisStage> {
        self.pending
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn evidence_for(&self, id: &CandidateId) -> Option<&EvidenceBundle> {
        self.candidates
            .iter()
            .position(|candidate| &candidate.id == id)
            .and_then(|index| self.evidence.get(index))
    }

    pub fn stage_log(&self) -> &[StageRecord] {
        &self.stage_log
    }

    pub fn results(&self) -> Option<&ResultSet> {
        self.results.as_ref()
    }

    pub fn status_view(&self) -> RunStatusView {
        RunStatusView {
            run_id: self.id.clone(),
            input: self.input.summary(),
            status: self.status,
            status_label: self.status.label(),
            stage: self.stage,
            stage_label: self.stage.label(),
            stage_description: self.stage.description(),
            progress_percent: self.progress_percent,
            candidate_count: self.candidates.len(),
            failure_reason: self.failure.clone(),
            stage_log: self.stage_log.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }

    fn ensure_running(&self) -> Result<(), PipelineError> {
        if self.status.is_terminal() {
            return Err(PipelineError::RunFinalized(self.id.clone()));
        }
        Ok(())
    }

    pub(crate) fn begin_stage(
        &mut self,
        stage: AnalysisStage,
        progress: u8,
    ) -> Result<(), PipelineError> {
        self.ensure_running()?;
        self.stage = self.stage.max(stage);
        self.progress_percent = self.progress_percent.max(progress);
        Ok(())
    }

    pub(crate) fn finish_stage(
        &mut self,
        record: StageRecord,
        progress: u8,
    ) -> Result<(), PipelineError> {
        self.ensure_running()?;
        self.pending = record.stage.next();
        self.progress_percent = self.progress_percent.max(progress);
        self.stage_log.push(record);
        Ok(())
    }

    pub(crate) fn install_candidates(
        &mut self,
        candidates: Vec<Candidate>,
    ) -> Result<(), PipelineError> {
        self.ensure_running()?;
        validate_candidates(&candidates).map_err(PipelineError::FatalExtraction)?;
        self.evidence = vec![EvidenceBundle::default(); candidates.len()];
        self.candidates = candidates;
        Ok(())
    }

    pub(crate) fn evidence_entries_mut(
        &mut self,
    ) -> Result<impl Iterator<Item = (&Candidate, &mut EvidenceBundle)>, PipelineError> {
        self.ensure_running()?;
        Ok(self.candidates.iter().zip(self.evidence.iter_mut()))
    }

    pub(crate) fn evidence_entries(&self) -> impl Iterator<Item = (&Candidate, &EvidenceBundle)> {
        self.candidates.iter().zip(self.evidence.iter())
    }

    pub(crate) fn complete(&mut self, results: ResultSet) -> Result<(), PipelineError> {
        self.ensure_running()?;
        self.results = Some(results);
        self.pending = None;
        self.progress_percent = 100;
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn fail(&mut self, reason: String) -> Result<(), PipelineError> {
        self.ensure_running()?;
        self.pending = None;
        self.status = RunStatus::Failed;
        self.failure = Some(reason);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Partial evidence is discarded; only the stage log survives.
    pub(crate) fn cancel(&mut self) -> Result<(), PipelineError> {
        self.ensure_running()?;
        self.pending = None;
        self.status = RunStatus::Cancelled;
        self.candidates.clear();
        self.evidence.clear();
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

pub(crate) fn validate_candidates(candidates: &[Candidate]) -> Result<(), String> {
    if candidates.is_empty() {
        return Err("extraction produced no candidates".to_string());
    }

    let mut seen = HashSet::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate.length == 0 {
            return Err(format!("candidate {} has zero length", candidate.id));
        }
        if !seen.insert(&candidate.id) {
            return Err(format!("candidate id {} is not unique", candidate.id));
        }
    }

    Ok(())
}

/// Serializable snapshot of a run for status endpoints and CLI output.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusView {
    pub run_id: RunId,
    pub input: InputSummary,
    pub status: RunStatus,
    pub status_label: &'static str,
    pub stage: AnalysisStage,
    pub stage_label: &'static str,
    pub stage_description: &'static str,
    pub progress_percent: u8,
    pub candidate_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub stage_log: Vec<StageRecord>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}
