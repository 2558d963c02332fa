use super::super::domain::{CandidateId, RunId};
use super::super::scoring::{Classification, ScoredCandidate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationCount {
    pub classification: Classification,
    pub key: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCandidate {
    pub id: CandidateId,
    pub total_score: u8,
    pub classification: Classification,
}

/// Batch-level figures shown above result tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub run_id: RunId,
    pub total: usize,
    pub counts: Vec<ClassificationCount>,
    pub mean_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_candidate: Option<TopCandidate>,
}

impl ResultSummary {
    pub fn count(&self, classification: Classification) -> usize {
        self.counts
            .iter()
            .find(|entry| entry.classification == classification)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

pub(crate) fn summarize(run_id: &RunId, scored: &[ScoredCandidate]) -> ResultSummary {
    let counts = Classification::ordered()
        .into_iter()
        .map(|classification| ClassificationCount {
            classification,
            key: classification.key(),
            count: scored
                .iter()
                .filter(|candidate| candidate.classification() == classification)
                .count(),
        })
        .collect();

    let mean_score = if scored.is_empty() {
        0.0
    } else {
        let sum: u32 = scored
            .iter()
            .map(|candidate| u32::from(candidate.total_score()))
            .sum();
        let mean = f64::from(sum) / scored.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    // First candidate wins ties, so the top pick is stable across reruns.
    let top_candidate = scored
        .iter()
        .reduce(|best, candidate| {
            if candidate.total_score() > best.total_score() {
                candidate
            } else {
                best
            }
        })
        .map(|best| TopCandidate {
            id: best.candidate().id.clone(),
            total_score: best.total_score(),
            classification: best.classification(),
        });

    ResultSummary {
        run_id: run_id.clone(),
        total: scored.len(),
        counts,
        mean_score,
        top_candidate,
    }
}
