use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::config::PipelineSettings;
use crate::workflows::analysis::domain::{
    AnalysisStage, BlastHit, Candidate, CandidateId, EvidenceBundle, Reading, RunId,
};
use crate::workflows::analysis::pipeline::{
    AnalysisBackend, PipelineOrchestrator, ProgressEvent, ProgressObserver, StageError,
};
use crate::workflows::analysis::repository::{RepositoryError, RunRepository};
use crate::workflows::analysis::results::ResultSet;
use crate::workflows::analysis::run::AnalysisRun;
use crate::workflows::analysis::scoring::{ScoringEngine, ScoringProfile};
use crate::workflows::analysis::service::AnalysisService;
use crate::workflows::fasta::SequenceInput;

pub(super) const GENOME: &str = ">contig_1 test chromosome\nATGAAACGCTTTGCATAA\n>contig_2\nATGCCCGGGTAA\n";

/// Canned answer for one stage call.
#[derive(Debug, Clone)]
pub(super) enum Reply<T> {
    Value(T),
    Fail(StageError),
    Hang,
}

impl<T> Default for Reply<T>
where
    T: Default,
{
    fn default() -> Self {
        Reply::Value(T::default())
    }
}

/// Scripted backend: every stage answers from its `Reply`, and `flaky` makes
/// a stage fail with a transport error a number of times first.
#[derive(Debug, Default)]
pub(super) struct StubBackend {
    pub(super) extraction: Reply<Vec<Candidate>>,
    pub(super) ml: Reply<HashMap<CandidateId, f64>>,
    pub(super) homology: Reply<HashMap<CandidateId, Option<BlastHit>>>,
    pub(super) domains: Reply<HashMap<CandidateId, bool>>,
    pub(super) signal: Reply<HashMap<CandidateId, bool>>,
    pub(super) flaky: Mutex<HashMap<AnalysisStage, u32>>,
    pub(super) calls: Mutex<Vec<AnalysisStage>>,
}

impl StubBackend {
    pub(super) fn with_flaky(self, stage: AnalysisStage, failures: u32) -> Self {
        self.flaky
            .lock()
            .expect("flaky mutex poisoned")
            .insert(stage, failures);
        self
    }

    pub(super) fn calls(&self) -> Vec<AnalysisStage> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn call_count(&self, stage: AnalysisStage) -> usize {
        self.calls().into_iter().filter(|call| *call == stage).count()
    }

    fn record_call(&self, stage: AnalysisStage) -> bool {
        self.calls.lock().expect("calls mutex poisoned").push(stage);
        let mut flaky = self.flaky.lock().expect("flaky mutex poisoned");
        match flaky.get_mut(&stage) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    async fn respond<T: Clone>(&self, stage: AnalysisStage, reply: &Reply<T>) -> Result<T, StageError> {
        if self.record_call(stage) {
            return Err(StageError::Transport("connection reset by peer".to_string()));
        }
        match reply {
            Reply::Value(value) => Ok(value.clone()),
            Reply::Fail(error) => Err(error.clone()),
            Reply::Hang => std::future::pending::<Result<T, StageError>>().await,
        }
    }
}

impl AnalysisBackend for StubBackend {
    async fn extract_candidates(&self, _input: &SequenceInput) -> Result<Vec<Candidate>, StageError> {
        self.respond(AnalysisStage::ExtractCandidates, &self.extraction)
            .await
    }

    async fn score_ml(
        &self,
        _candidates: &[Candidate],
    ) -> Result<HashMap<CandidateId, f64>, StageError> {
        self.respond(AnalysisStage::ScoreMl, &self.ml).await
    }

    async fn search_homology(
        &self,
        _candidates: &[Candidate],
    ) -> Result<HashMap<CandidateId, Option<BlastHit>>, StageError> {
        self.respond(AnalysisStage::SearchHomology, &self.homology)
            .await
    }

    async fn search_domains(
        &self,
        _candidates: &[Candidate],
    ) -> Result<HashMap<CandidateId, bool>, StageError> {
        self.respond(AnalysisStage::SearchDomains, &self.domains)
            .await
    }

    async fn detect_signal(
        &self,
        _candidates: &[Candidate],
    ) -> Result<HashMap<CandidateId, bool>, StageError> {
        self.respond(AnalysisStage::DetectSignal, &self.signal)
            .await
    }
}

pub(super) fn candidate(id: &str, length: u32) -> Candidate {
    Candidate {
        id: CandidateId::from(id),
        length,
        contig: "contig_1".to_string(),
    }
}

pub(super) fn candidates(count: usize) -> Vec<Candidate> {
    (1..=count)
        .map(|index| candidate(&format!("orf_{index}"), 300 + index as u32 * 3))
        .collect()
}

fn keyed<T>(entries: Vec<(&str, T)>) -> HashMap<CandidateId, T> {
    entries
        .into_iter()
        .map(|(id, value)| (CandidateId::from(id), value))
        .collect()
}

/// Five candidates with totals 10, 1, 4, 3, 0 under the standard profile.
pub(super) fn evidence_backend() -> StubBackend {
    StubBackend {
        extraction: Reply::Value(candidates(5)),
        ml: Reply::Value(keyed(vec![
            ("orf_1", 0.75),
            ("orf_2", 0.55),
            ("orf_3", 0.2),
            ("orf_4", 0.9),
            ("orf_5", 0.1),
        ])),
        homology: Reply::Value(keyed(vec![
            ("orf_1", Some(BlastHit::new(92.0, 1e-20))),
            ("orf_2", None),
            ("orf_3", Some(BlastHit::new(65.0, 1e-8))),
            ("orf_4", None),
            ("orf_5", None),
        ])),
        domains: Reply::Value(keyed(vec![
            ("orf_1", true),
            ("orf_2", false),
            ("orf_3", true),
            ("orf_4", false),
            ("orf_5", false),
        ])),
        signal: Reply::Value(keyed(vec![
            ("orf_1", true),
            ("orf_2", false),
            ("orf_3", true),
            ("orf_4", true),
            ("orf_5", false),
        ])),
        ..StubBackend::default()
    }
}

pub(super) fn settings() -> PipelineSettings {
    PipelineSettings {
        stage_timeout: Duration::from_millis(50),
        stage_retries: 0,
        scoring_profile: ScoringProfile::Standard,
    }
}

pub(super) fn orchestrator(backend: StubBackend) -> (PipelineOrchestrator<StubBackend>, Arc<StubBackend>) {
    let backend = Arc::new(backend);
    (
        PipelineOrchestrator::new(backend.clone(), &settings()),
        backend,
    )
}

pub(super) fn input() -> SequenceInput {
    SequenceInput::parse("genome.fasta", GENOME).expect("valid fasta")
}

pub(super) fn evidence(ml: f64, hit: Option<BlastHit>, hmm: bool, signal: bool) -> EvidenceBundle {
    EvidenceBundle {
        ml_probability: Reading::Observed(ml),
        blast_hit: Reading::Observed(hit),
        hmm_hit: Reading::Observed(hmm),
        signal_peptide: Reading::Observed(signal),
    }
}

pub(super) fn absent_evidence() -> EvidenceBundle {
    EvidenceBundle {
        ml_probability: Reading::Unavailable("ml service offline".to_string()),
        blast_hit: Reading::Observed(None),
        hmm_hit: Reading::Observed(false),
        signal_peptide: Reading::Observed(false),
    }
}

/// Scored batch matching `evidence_backend`, built without running stages.
pub(super) fn result_set() -> ResultSet {
    let engine = ScoringEngine::default();
    let bundles = [
        evidence(0.75, Some(BlastHit::new(92.0, 1e-20)), true, true),
        evidence(0.55, None, false, false),
        evidence(0.2, Some(BlastHit::new(65.0, 1e-8)), true, true),
        evidence(0.9, None, false, true),
        absent_evidence(),
    ];
    let scored = candidates(5)
        .into_iter()
        .zip(bundles)
        .map(|(candidate, bundle)| engine.score(candidate, bundle))
        .collect();
    ResultSet::new(RunId("run-fixture".to_string()), scored)
}

#[derive(Default)]
pub(super) struct RecordingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    pub(super) fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("events mutex poisoned").clone()
    }

    pub(super) fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .map(|event| event.progress_percent)
            .collect()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push(event.clone());
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRunRepository {
    pub(super) runs: Arc<Mutex<HashMap<RunId, AnalysisRun>>>,
}

impl RunRepository for MemoryRunRepository {
    fn insert(&self, run: AnalysisRun) -> Result<AnalysisRun, RepositoryError> {
        let mut guard = self.runs.lock().expect("repository mutex poisoned");
        if guard.contains_key(run.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(run.id().clone(), run.clone());
        Ok(run)
    }

    fn update(&self, run: AnalysisRun) -> Result<(), RepositoryError> {
        let mut guard = self.runs.lock().expect("repository mutex poisoned");
        guard.insert(run.id().clone(), run);
        Ok(())
    }

    fn fetch(&self, id: &RunId) -> Result<Option<AnalysisRun>, RepositoryError> {
        let guard = self.runs.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl RunRepository for UnavailableRepository {
    fn insert(&self, _run: AnalysisRun) -> Result<AnalysisRun, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _run: AnalysisRun) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &RunId) -> Result<Option<AnalysisRun>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service(
    backend: StubBackend,
) -> (
    Arc<AnalysisService<StubBackend, MemoryRunRepository>>,
    Arc<MemoryRunRepository>,
) {
    let repository = Arc::new(MemoryRunRepository::default());
    let service = AnalysisService::new(Arc::new(backend), repository.clone(), &settings());
    (Arc::new(service), repository)
}

/// Poll the repository until the run leaves `running`.
pub(super) async fn wait_for_terminal(
    repository: &MemoryRunRepository,
    id: &RunId,
) -> AnalysisRun {
    for _ in 0..200 {
        if let Some(run) = repository.fetch(id).expect("fetch succeeds") {
            if run.status().is_terminal() {
                return run;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("run {id} did not finish in time");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
