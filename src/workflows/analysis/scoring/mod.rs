mod config;
mod policy;
mod rules;

pub use config::{HomologyTier, ScoringConfig, ScoringProfile};
pub use policy::Classification;

use super::domain::{Candidate, EvidenceBundle, EvidenceKind};
use policy::classify;
use serde::Serialize;

/// Stateless evaluator mapping one evidence bundle to points and a label.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn for_profile(profile: ScoringProfile) -> Self {
        Self::new(profile.config())
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Label for a total under this engine's bands.
    pub fn classify(&self, total_score: u8) -> Classification {
        classify(total_score, &self.config)
    }

    pub fn evaluate(&self, evidence: &EvidenceBundle) -> ScoreCard {
        let (components, points) = rules::score_evidence(evidence, &self.config);
        let total = points
            .ml
            .saturating_add(points.blast)
            .saturating_add(points.hmm)
            .saturating_add(points.signal);

        ScoreCard {
            ml_points: points.ml,
            blast_points: points.blast,
            hmm_points: points.hmm,
            signal_points: points.signal,
            classification: classify(total, &self.config),
            components,
        }
    }

    pub fn score(&self, candidate: Candidate, evidence: EvidenceBundle) -> ScoredCandidate {
        let card = self.evaluate(&evidence);
        ScoredCandidate {
            candidate,
            evidence,
            card,
        }
    }
}

/// Discrete contribution to a score, kept for transparent audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreComponent {
    pub evidence: EvidenceKind,
    pub points: u8,
    pub evaluated: bool,
    pub notes: String,
}

/// Points per evidence kind plus the derived label. Only the engine builds
/// these, so the total is always the sum of its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ScoreCardView")]
pub struct ScoreCard {
    ml_points: u8,
    blast_points: u8,
    hmm_points: u8,
    signal_points: u8,
    classification: Classification,
    components: Vec<ScoreComponent>,
}

impl ScoreCard {
    pub fn ml_points(&self) -> u8 {
        self.ml_points
    }

    pub fn blast_points(&self) -> u8 {
        self.blast_points
    }

    pub fn hmm_points(&self) -> u8 {
        self.hmm_points
    }

    pub fn signal_points(&self) -> u8 {
        self.signal_points
    }

    pub fn total_score(&self) -> u8 {
        self.ml_points
            .saturating_add(self.blast_points)
            .saturating_add(self.hmm_points)
            .saturating_add(self.signal_points)
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn components(&self) -> &[ScoreComponent] {
        &self.components
    }
}

#[derive(Serialize)]
struct ScoreCardView {
    ml_points: u8,
    blast_points: u8,
    hmm_points: u8,
    signal_points: u8,
    total_score: u8,
    classification: Classification,
    components: Vec<ScoreComponent>,
}

impl From<ScoreCard> for ScoreCardView {
    fn from(card: ScoreCard) -> Self {
        Self {
            total_score: card.total_score(),
            ml_points: card.ml_points,
            blast_points: card.blast_points,
            hmm_points: card.hmm_points,
            signal_points: card.signal_points,
            classification: card.classification,
            components: card.components,
        }
    }
}

/// Candidate with its evidence and the score card derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    candidate: Candidate,
    evidence: EvidenceBundle,
    #[serde(flatten)]
    card: ScoreCard,
}

impl ScoredCandidate {
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn evidence(&self) -> &EvidenceBundle {
        &self.evidence
    }

    pub fn card(&self) -> &ScoreCard {
        &self.card
    }

    pub fn total_score(&self) -> u8 {
        self.card.total_score()
    }

    pub fn classification(&self) -> Classification {
        self.card.classification()
    }

    /// Recompute the card from the stored evidence with the given engine.
    pub fn rescore(&self, engine: &ScoringEngine) -> Self {
        engine.score(self.candidate.clone(), self.evidence.clone())
    }
}
