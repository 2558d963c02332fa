use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a candidate open reading frame, unique within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier wrapper for analysis runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Putative protein-coding region produced by the extraction stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub length: u32,
    pub contig: String,
}

/// Significant match against the reference virulence database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastHit {
    pub identity_percent: f64,
    pub evalue: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl BlastHit {
    pub fn new(identity_percent: f64, evalue: f64) -> Self {
        Self {
            identity_percent,
            evalue,
            subject: None,
        }
    }
}

/// One evidence reading. `Unavailable` keeps the reason the value is missing
/// so a degraded stage stays auditable per candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Reading<T> {
    Pending,
    Observed(T),
    Unavailable(String),
}

impl<T> Reading<T> {
    pub fn observed(&self) -> Option<&T> {
        match self {
            Reading::Observed(value) => Some(value),
            Reading::Pending | Reading::Unavailable(_) => None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        matches!(self, Reading::Observed(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Reading::Unavailable(reason) => Some(reason),
            Reading::Pending | Reading::Observed(_) => None,
        }
    }
}

impl<T> Default for Reading<T> {
    fn default() -> Self {
        Reading::Pending
    }
}

/// The four independent evidence readings collected for one candidate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub ml_probability: Reading<f64>,
    /// `Observed(None)` is an evaluated search with no significant hit.
    pub blast_hit: Reading<Option<BlastHit>>,
    pub hmm_hit: Reading<bool>,
    pub signal_peptide: Reading<bool>,
}

impl EvidenceBundle {
    pub fn ml_probability(&self) -> Option<f64> {
        self.ml_probability.observed().copied()
    }

    pub fn blast_hit(&self) -> Option<&BlastHit> {
        self.blast_hit.observed().and_then(Option::as_ref)
    }

    pub fn hmm_hit(&self) -> bool {
        self.hmm_hit.observed().copied().unwrap_or(false)
    }

    pub fn signal_peptide(&self) -> bool {
        self.signal_peptide.observed().copied().unwrap_or(false)
    }

    /// Evidence kinds that were never evaluated, for audit output.
    pub fn not_evaluated(&self) -> Vec<EvidenceKind> {
        let mut missing = Vec::new();
        if !self.ml_probability.is_evaluated() {
            missing.push(EvidenceKind::MlProbability);
        }
        if !self.blast_hit.is_evaluated() {
            missing.push(EvidenceKind::Homology);
        }
        if !self.hmm_hit.is_evaluated() {
            missing.push(EvidenceKind::Domain);
        }
        if !self.signal_peptide.is_evaluated() {
            missing.push(EvidenceKind::Secretion);
        }
        missing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    MlProbability,
    Homology,
    Domain,
    Secretion,
}

impl EvidenceKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::MlProbability,
            Self::Homology,
            Self::Domain,
            Self::Secretion,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::MlProbability => "ML probability",
            Self::Homology => "Homology (BLAST)",
            Self::Domain => "Virulence domain (HMM)",
            Self::Secretion => "Signal peptide",
        }
    }
}

/// Fixed pipeline stage sequence. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStage {
    ExtractCandidates,
    ScoreMl,
    SearchHomology,
    SearchDomains,
    DetectSignal,
    Aggregate,
}

impl AnalysisStage {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::ExtractCandidates,
            Self::ScoreMl,
            Self::SearchHomology,
            Self::SearchDomains,
            Self::DetectSignal,
            Self::Aggregate,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ExtractCandidates => "extract-candidates",
            Self::ScoreMl => "score-ml",
            Self::SearchHomology => "search-homology",
            Self::SearchDomains => "search-domains",
            Self::DetectSignal => "detect-signal",
            Self::Aggregate => "aggregate",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::ExtractCandidates => "Predicting ORFs",
            Self::ScoreMl => "Running ML predictions",
            Self::SearchHomology => "Running BLAST analysis",
            Self::SearchDomains => "Searching virulence domains",
            Self::DetectSignal => "Detecting signal peptides",
            Self::Aggregate => "Calculating VF scores",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::ExtractCandidates => Some(Self::ScoreMl),
            Self::ScoreMl => Some(Self::SearchHomology),
            Self::SearchHomology => Some(Self::SearchDomains),
            Self::SearchDomains => Some(Self::DetectSignal),
            Self::DetectSignal => Some(Self::Aggregate),
            Self::Aggregate => None,
        }
    }

    /// Evidence field populated by this stage, if it is an evidence stage.
    pub const fn evidence(self) -> Option<EvidenceKind> {
        match self {
            Self::ScoreMl => Some(EvidenceKind::MlProbability),
            Self::SearchHomology => Some(EvidenceKind::Homology),
            Self::SearchDomains => Some(EvidenceKind::Domain),
            Self::DetectSignal => Some(EvidenceKind::Secretion),
            Self::ExtractCandidates | Self::Aggregate => None,
        }
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// How a single stage ended, kept in the run's stage log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Degraded { reason: String },
    Failed { reason: String },
}

impl StageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::Completed => "completed",
            StageOutcome::Degraded { .. } => "degraded",
            StageOutcome::Failed { .. } => "failed",
        }
    }
}
