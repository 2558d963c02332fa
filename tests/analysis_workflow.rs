use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vf_detector::config::PipelineSettings;
use vf_detector::workflows::analysis::{
    AnalysisRun, AnalysisService, AnalysisStage, CancellationHandle, Classification,
    ClassificationFilter, PipelineOrchestrator, ProgressEvent, RepositoryError, RunId,
    RunRepository, RunStatus, ScoringProfile, SortDirection, SortKey, StageOutcome,
};
use vf_detector::workflows::manifest::{EvidenceManifest, ManifestBackend};

const GENOME: &str = ">contig_1 Salmonella enterica chromosome\nATGAAACGCATTAGCACCACCATTACCACCACCATCACCATTACCACAGGTAACGGTGCGGGCTGA\n>plasmid_1\nATGCGTACGTTAGCCGCTAA\n";

fn manifest() -> EvidenceManifest {
    EvidenceManifest::from_json_str(
        r#"{
            "candidates": [
                {"id": "orf_0001", "contig": "contig_1", "length": 1206, "ml_probability": 0.75,
                 "blast_hit": {"identity_percent": 92.0, "evalue": 1e-20, "subject": "invA"},
                 "hmm_hit": true, "signal_peptide": true},
                {"id": "orf_0002", "contig": "contig_1", "length": 318,
                 "hmm_hit": false, "signal_peptide": false},
                {"id": "orf_0003", "contig": "contig_1", "length": 642, "ml_probability": 0.55,
                 "hmm_hit": false, "signal_peptide": false},
                {"id": "orf_0004", "contig": "plasmid_1", "length": 903, "ml_probability": 0.91,
                 "blast_hit": {"identity_percent": 81.0, "evalue": 1e-40},
                 "hmm_hit": false, "signal_peptide": true},
                {"id": "orf_0099", "contig": "unrelated_contig", "length": 99, "ml_probability": 0.99}
            ]
        }"#,
    )
    .expect("manifest parses")
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        stage_timeout: Duration::from_millis(100),
        ..PipelineSettings::default()
    }
}

#[derive(Default)]
struct Runs(Mutex<HashMap<RunId, AnalysisRun>>);

impl RunRepository for Runs {
    fn insert(&self, run: AnalysisRun) -> Result<AnalysisRun, RepositoryError> {
        let mut runs = self.0.lock().expect("runs mutex poisoned");
        if runs.contains_key(run.id()) {
            return Err(RepositoryError::Conflict);
        }
        runs.insert(run.id().clone(), run.clone());
        Ok(run)
    }

    fn update(&self, run: AnalysisRun) -> Result<(), RepositoryError> {
        self.0
            .lock()
            .expect("runs mutex poisoned")
            .insert(run.id().clone(), run);
        Ok(())
    }

    fn fetch(&self, id: &RunId) -> Result<Option<AnalysisRun>, RepositoryError> {
        Ok(self.0.lock().expect("runs mutex poisoned").get(id).cloned())
    }
}

#[tokio::test]
async fn manifest_replay_scores_and_classifies_candidates() {
    let backend = Arc::new(ManifestBackend::new(manifest()));
    let orchestrator = PipelineOrchestrator::new(backend, &settings());
    let events: Mutex<Vec<ProgressEvent>> = Mutex::new(Vec::new());
    let observer = |event: &ProgressEvent| events.lock().unwrap().push(event.clone());

    let mut run = orchestrator
        .prepare("salmonella.fna", GENOME)
        .expect("valid genome");
    let status = orchestrator
        .run(&mut run, &CancellationHandle::new(), &observer)
        .await
        .expect("run completes");
    assert_eq!(status, RunStatus::Completed);

    let results = run.results().expect("results stored");
    assert_eq!(results.len(), 4, "candidates on unknown contigs are not extracted");

    let summary = results.summary();
    assert_eq!(summary.count(Classification::HighConfidence), 2);
    assert_eq!(summary.count(Classification::LowConfidence), 1);
    assert_eq!(summary.count(Classification::NonVf), 1);

    let ordered: Vec<String> = results
        .sort_by(SortKey::TotalScore, SortDirection::Desc)
        .ids()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ordered, ["orf_0001", "orf_0004", "orf_0003", "orf_0002"]);

    let progress: Vec<u8> = events
        .lock()
        .unwrap()
        .iter()
        .map(|event| event.progress_percent)
        .collect();
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(progress.last(), Some(&100));
}

#[tokio::test]
async fn unavailable_tool_degrades_without_failing_the_run() {
    let mut manifest = manifest();
    manifest.unavailable_stages = vec![AnalysisStage::SearchHomology];
    let orchestrator = PipelineOrchestrator::new(Arc::new(ManifestBackend::new(manifest)), &settings());
    let observer = |_: &ProgressEvent| {};

    let mut run = orchestrator
        .prepare("salmonella.fasta", GENOME)
        .expect("valid genome");
    orchestrator
        .run(&mut run, &CancellationHandle::new(), &observer)
        .await
        .expect("run completes");

    let homology = &run.stage_log()[2];
    assert_eq!(homology.stage, AnalysisStage::SearchHomology);
    assert!(matches!(homology.outcome, StageOutcome::Degraded { .. }));

    let results = run.results().expect("results stored");
    assert!(results
        .iter()
        .all(|scored| scored.card().blast_points() == 0));
    let top = results.get(&"orf_0001".into()).expect("orf_0001 scored");
    assert_eq!(top.total_score(), 6);
    assert_eq!(top.classification(), Classification::Putative);
}

#[tokio::test]
async fn slow_tool_times_out_and_is_skipped() {
    let mut manifest = manifest();
    manifest.delays_ms.insert(AnalysisStage::DetectSignal, 500);
    let orchestrator = PipelineOrchestrator::new(Arc::new(ManifestBackend::new(manifest)), &settings());

    let mut run = orchestrator
        .prepare("salmonella.fasta", GENOME)
        .expect("valid genome");
    orchestrator
        .run(&mut run, &CancellationHandle::new(), &|_: &ProgressEvent| {})
        .await
        .expect("run completes");

    match &run.stage_log()[4].outcome {
        StageOutcome::Degraded { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected timeout degradation, got {other:?}"),
    }
    assert_eq!(run.status(), RunStatus::Completed);
}

#[tokio::test]
async fn legacy_profile_rescales_the_same_evidence() {
    let settings = PipelineSettings {
        scoring_profile: ScoringProfile::Legacy,
        ..settings()
    };
    let orchestrator = PipelineOrchestrator::new(Arc::new(ManifestBackend::new(manifest())), &settings);

    let mut run = orchestrator
        .prepare("salmonella.fasta", GENOME)
        .expect("valid genome");
    orchestrator
        .run(&mut run, &CancellationHandle::new(), &|_: &ProgressEvent| {})
        .await
        .expect("run completes");

    let results = run.results().expect("results stored");
    let top = results.get(&"orf_0001".into()).expect("orf_0001 scored");
    assert_eq!(top.total_score(), 6);
    assert_eq!(top.card().hmm_points(), 0);
    assert_eq!(top.classification(), Classification::HighConfidence);
}

#[tokio::test]
async fn service_exports_the_full_batch_as_csv() {
    let service = AnalysisService::new(
        Arc::new(ManifestBackend::new(manifest())),
        Arc::new(Runs::default()),
        &settings(),
    );

    let run = service
        .analyze("salmonella.fasta", GENOME, &|_: &ProgressEvent| {})
        .await
        .expect("analysis completes");

    let high_only = run
        .results()
        .expect("results")
        .filter_by_classification(ClassificationFilter::Only(Classification::HighConfidence));
    assert_eq!(high_only.len(), 2);

    let csv = service.export_csv(run.id()).expect("csv export");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "ORF_ID,VF_Score,Classification,ML_Score,BLAST_Score,SignalP_Score,ML_Probability,Length"
    );
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[2], "orf_0002,0,Non-VF,0,0,0,N/A,318");
}

#[tokio::test]
async fn rejected_uploads_never_start_a_run() {
    let service = AnalysisService::new(
        Arc::new(ManifestBackend::new(manifest())),
        Arc::new(Runs::default()),
        &settings(),
    );

    let error = service
        .analyze("salmonella.gb", GENOME, &|_: &ProgressEvent| {})
        .await
        .expect_err("genbank files are not accepted");
    assert!(error.to_string().contains(".fasta"));
}
