//! Evidence replay: an `AnalysisBackend` that answers every stage call from a
//! JSON manifest of precomputed readings. Used by the API service and the CLI
//! when the real prediction tools are run out of band.

use crate::workflows::analysis::{
    AnalysisBackend, AnalysisStage, BlastHit, Candidate, CandidateId, StageError,
};
use crate::workflows::fasta::SequenceInput;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub enum ManifestError {
    Io(std::io::Error),
    Json(serde_json::Error),
    DuplicateCandidate(CandidateId),
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestError::Io(err) => write!(f, "failed to read evidence manifest: {}", err),
            ManifestError::Json(err) => write!(f, "invalid evidence manifest: {}", err),
            ManifestError::DuplicateCandidate(id) => {
                write!(f, "evidence manifest lists candidate '{}' twice", id)
            }
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Io(err) => Some(err),
            ManifestError::Json(err) => Some(err),
            ManifestError::DuplicateCandidate(_) => None,
        }
    }
}

impl From<std::io::Error> for ManifestError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Precomputed readings for one candidate. Omitted readings are simply not
/// reported by the corresponding stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestCandidate {
    pub id: CandidateId,
    pub contig: String,
    pub length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blast_hit: Option<BlastHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmm_hit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_peptide: Option<bool>,
}

impl ManifestCandidate {
    fn candidate(&self) -> Candidate {
        Candidate {
            id: self.id.clone(),
            length: self.length,
            contig: self.contig.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceManifest {
    #[serde(default)]
    pub candidates: Vec<ManifestCandidate>,
    /// Stages that fail with a transport error, simulating a missing tool.
    #[serde(default)]
    pub unavailable_stages: Vec<AnalysisStage>,
    /// Artificial per-stage latency in milliseconds.
    #[serde(default)]
    pub delays_ms: HashMap<AnalysisStage, u64>,
}

impl EvidenceManifest {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_reader(reader)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(raw)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::with_capacity(self.candidates.len());
        for entry in &self.candidates {
            if !seen.insert(&entry.id) {
                return Err(ManifestError::DuplicateCandidate(entry.id.clone()));
            }
        }
        Ok(())
    }
}

/// Replays manifest readings as if each stage had called its service.
#[derive(Debug, Clone, Default)]
pub struct ManifestBackend {
    manifest: EvidenceManifest,
}

impl ManifestBackend {
    pub fn new(manifest: EvidenceManifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &EvidenceManifest {
        &self.manifest
    }

    async fn gate(&self, stage: AnalysisStage) -> Result<(), StageError> {
        if let Some(delay) = self.manifest.delays_ms.get(&stage) {
            tokio::time::sleep(Duration::from_millis(*delay)).await;
        }
        if self.manifest.unavailable_stages.contains(&stage) {
            return Err(StageError::Transport(format!(
                "{} service is not available",
                stage.label()
            )));
        }
        debug!(%stage, "replaying manifest evidence");
        Ok(())
    }

    fn readings<T, F>(&self, candidates: &[Candidate], read: F) -> HashMap<CandidateId, T>
    where
        F: Fn(&ManifestCandidate) -> Option<T>,
    {
        let requested: HashSet<&CandidateId> = candidates.iter().map(|c| &c.id).collect();
        self.manifest
            .candidates
            .iter()
            .filter(|entry| requested.contains(&entry.id))
            .filter_map(|entry| read(entry).map(|value| (entry.id.clone(), value)))
            .collect()
    }
}

impl AnalysisBackend for ManifestBackend {
    async fn extract_candidates(&self, input: &SequenceInput) -> Result<Vec<Candidate>, StageError> {
        self.gate(AnalysisStage::ExtractCandidates).await?;
        let contigs: HashSet<&str> = input.contig_ids().collect();
        Ok(self
            .manifest
            .candidates
            .iter()
            .filter(|entry| contigs.contains(entry.contig.as_str()))
            .map(ManifestCandidate::candidate)
            .collect())
    }

    async fn score_ml(
        &self,
        candidates: &[Candidate],
    ) -> Result<HashMap<CandidateId, f64>, StageError> {
        self.gate(AnalysisStage::ScoreMl).await?;
        Ok(self.readings(candidates, |entry| entry.ml_probability))
    }

    async fn search_homology(
        &self,
        candidates: &[Candidate],
    ) -> Result<HashMap<CandidateId, Option<BlastHit>>, StageError> {
        self.gate(AnalysisStage::SearchHomology).await?;
        Ok(self.readings(candidates, |entry| Some(entry.blast_hit.clone())))
    }

    async fn search_domains(
        &self,
        candidates: &[Candidate],
    ) -> Result<HashMap<CandidateId, bool>, StageError> {
        self.gate(AnalysisStage::SearchDomains).await?;
        Ok(self.readings(candidates, |entry| entry.hmm_hit))
    }

    async fn detect_signal(
        &self,
        candidates: &[Candidate],
    ) -> Result<HashMap<CandidateId, bool>, StageError> {
        self.gate(AnalysisStage::DetectSignal).await?;
        Ok(self.readings(candidates, |entry| entry.signal_peptide))
    }
}
