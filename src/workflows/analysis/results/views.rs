use super::super::domain::{CandidateId, EvidenceKind};
use super::super::scoring::{Classification, ScoredCandidate};
use super::ResultSet;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// `All` or a single classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub enum ClassificationFilter {
    #[default]
    All,
    Only(Classification),
}

impl ClassificationFilter {
    pub fn matches(self, classification: Classification) -> bool {
        match self {
            ClassificationFilter::All => true,
            ClassificationFilter::Only(expected) => expected == classification,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ClassificationFilter::All => "all",
            ClassificationFilter::Only(classification) => classification.label(),
        }
    }
}

impl From<Classification> for ClassificationFilter {
    fn from(value: Classification) -> Self {
        ClassificationFilter::Only(value)
    }
}

impl From<ClassificationFilter> for String {
    fn from(value: ClassificationFilter) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for ClassificationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ClassificationFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(ClassificationFilter::All);
        }
        value.parse::<Classification>().map(ClassificationFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    TotalScore,
    MlPoints,
    BlastPoints,
}

impl SortKey {
    pub const fn label(self) -> &'static str {
        match self {
            SortKey::TotalScore => "total_score",
            SortKey::MlPoints => "ml_points",
            SortKey::BlastPoints => "blast_points",
        }
    }

    fn value(self, scored: &ScoredCandidate) -> u8 {
        match self {
            SortKey::TotalScore => scored.total_score(),
            SortKey::MlPoints => scored.card().ml_points(),
            SortKey::BlastPoints => scored.card().blast_points(),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "totalscore" | "score" | "vfscore" => Ok(SortKey::TotalScore),
            "mlpoints" | "ml" | "mlscore" => Ok(SortKey::MlPoints),
            "blastpoints" | "blast" | "blastscore" => Ok(SortKey::BlastPoints),
            _ => Err(format!("unknown sort key '{}'", value.trim())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const fn label(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{other}'")),
        }
    }
}

/// Filter, order and truncation applied together, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResultQuery {
    pub classification: ClassificationFilter,
    pub sort: SortKey,
    pub direction: SortDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Ordered list of indices into a `ResultSet`. Building a view never touches
/// the underlying batch.
#[derive(Debug, Clone)]
pub struct ResultView<'a> {
    set: &'a ResultSet,
    indices: Vec<usize>,
}

impl<'a> ResultView<'a> {
    pub(crate) fn new(set: &'a ResultSet) -> Self {
        Self {
            set,
            indices: (0..set.len()).collect(),
        }
    }

    pub fn filter(mut self, filter: ClassificationFilter) -> Self {
        let scored = self.set.as_slice();
        self.indices
            .retain(|&index| filter.matches(scored[index].classification()));
        self
    }

    /// Equal keys keep their original batch order in either direction.
    pub fn sort_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        let scored = self.set.as_slice();
        self.indices.sort_by(|&left, &right| {
            let ordering = key.value(&scored[left]).cmp(&key.value(&scored[right]));
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then(left.cmp(&right))
        });
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.indices.truncate(count);
        self
    }

    pub fn apply(self, query: &ResultQuery) -> Self {
        let view = self
            .filter(query.classification)
            .sort_by(query.sort, query.direction);
        match query.limit {
            Some(count) => view.limit(count),
            None => view,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ScoredCandidate> + '_ {
        let set: &'a ResultSet = self.set;
        let scored = set.as_slice();
        self.indices.iter().map(move |&index| &scored[index])
    }

    pub fn ids(&self) -> Vec<&'a CandidateId> {
        self.iter().map(|scored| &scored.candidate().id).collect()
    }

    pub fn rows(&self) -> Vec<ResultRow> {
        self.iter().map(ResultRow::from).collect()
    }
}

/// Display row for result tables and the JSON results endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub orf_id: CandidateId,
    pub vf_score: u8,
    pub classification: Classification,
    pub ml_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ml_probability: Option<f64>,
    pub blast_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blast_identity: Option<f64>,
    pub hmm_score: u8,
    pub signalp_score: u8,
    pub length: u32,
    pub contig: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_evaluated: Vec<EvidenceKind>,
}

impl From<&ScoredCandidate> for ResultRow {
    fn from(scored: &ScoredCandidate) -> Self {
        let card = scored.card();
        let evidence = scored.evidence();
        Self {
            orf_id: scored.candidate().id.clone(),
            vf_score: card.total_score(),
            classification: card.classification(),
            ml_score: card.ml_points(),
            ml_probability: evidence.ml_probability(),
            blast_score: card.blast_points(),
            blast_identity: evidence.blast_hit().map(|hit| hit.identity_percent),
            hmm_score: card.hmm_points(),
            signalp_score: card.signal_points(),
            length: scored.candidate().length,
            contig: scored.candidate().contig.clone(),
            not_evaluated: evidence.not_evaluated(),
        }
    }
}
