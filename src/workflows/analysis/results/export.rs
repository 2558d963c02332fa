use super::super::domain::CandidateId;
use super::super::scoring::{Classification, ScoredCandidate};
use serde::{Serialize, Serializer};
use std::io::Write;

/// Column order downstream tooling depends on.
pub const EXPORT_HEADER: [&str; 8] = [
    "ORF_ID",
    "VF_Score",
    "Classification",
    "ML_Score",
    "BLAST_Score",
    "SignalP_Score",
    "ML_Probability",
    "Length",
];

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv record: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv output: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv output is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// One export row per candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    #[serde(rename = "ORF_ID")]
    pub id: CandidateId,
    #[serde(rename = "VF_Score")]
    pub total_score: u8,
    #[serde(rename = "Classification")]
    pub classification: Classification,
    #[serde(rename = "ML_Score")]
    pub ml_points: u8,
    #[serde(rename = "BLAST_Score")]
    pub blast_points: u8,
    #[serde(rename = "SignalP_Score")]
    pub signal_points: u8,
    #[serde(rename = "ML_Probability", serialize_with = "probability_cell")]
    pub ml_probability: Option<f64>,
    #[serde(rename = "Length")]
    pub length: u32,
}

impl From<&ScoredCandidate> for FlatRecord {
    fn from(scored: &ScoredCandidate) -> Self {
        let card = scored.card();
        Self {
            id: scored.candidate().id.clone(),
            total_score: card.total_score(),
            classification: card.classification(),
            ml_points: card.ml_points(),
            blast_points: card.blast_points(),
            signal_points: card.signal_points(),
            ml_probability: scored.evidence().ml_probability(),
            length: scored.candidate().length,
        }
    }
}

fn probability_cell<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(probability) => serializer.serialize_str(&format!("{probability:.3}")),
        None => serializer.serialize_str(NOT_AVAILABLE),
    }
}

pub(crate) fn write_records<W: Write>(
    records: &[FlatRecord],
    output: W,
) -> Result<W, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);
    writer.write_record(EXPORT_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))
}
