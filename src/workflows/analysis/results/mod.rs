mod export;
mod summary;
pub mod views;

pub use export::{ExportError, FlatRecord, EXPORT_HEADER, NOT_AVAILABLE};
pub use summary::{ClassificationCount, ResultSummary, TopCandidate};
pub use views::{
    ClassificationFilter, ResultQuery, ResultRow, ResultView, SortDirection, SortKey,
};

use super::domain::{CandidateId, RunId};
use super::scoring::ScoredCandidate;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

/// Scored batch of a completed run. Written once by the aggregate stage and
/// shared read-only afterwards; clones share the same storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    run_id: RunId,
    scored: Arc<[ScoredCandidate]>,
}

impl ResultSet {
    pub fn new(run_id: RunId, scored: Vec<ScoredCandidate>) -> Self {
        Self {
            run_id,
            scored: scored.into(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn len(&self) -> usize {
        self.scored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scored.is_empty()
    }

    pub fn as_slice(&self) -> &[ScoredCandidate] {
        &self.scored
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredCandidate> {
        self.scored.iter()
    }

    pub fn get(&self, id: &CandidateId) -> Option<&ScoredCandidate> {
        self.scored
            .iter()
            .find(|scored| &scored.candidate().id == id)
    }

    /// Every candidate in batch order.
    pub fn all(&self) -> ResultView<'_> {
        ResultView::new(self)
    }

    pub fn filter_by_classification(&self, filter: ClassificationFilter) -> ResultView<'_> {
        self.all().filter(filter)
    }

    pub fn sort_by(&self, key: SortKey, direction: SortDirection) -> ResultView<'_> {
        self.all().sort_by(key, direction)
    }

    pub fn query(&self, query: &ResultQuery) -> ResultView<'_> {
        self.all().apply(query)
    }

    /// Summary plus the rows selected by `query`.
    pub fn page(&self, query: &ResultQuery) -> ResultPage {
        let matching = self.filter_by_classification(query.classification).len();
        ResultPage {
            run_id: self.run_id.clone(),
            summary: self.summary(),
            query: *query,
            matching,
            rows: self.query(query).rows(),
        }
    }

    pub fn summary(&self) -> ResultSummary {
        summary::summarize(&self.run_id, &self.scored)
    }

    /// Export rows always cover the full batch, whatever view a caller holds.
    pub fn to_flat_records(&self) -> Vec<FlatRecord> {
        self.scored.iter().map(FlatRecord::from).collect()
    }

    pub fn write_csv<W: Write>(&self, output: W) -> Result<W, ExportError> {
        export::write_records(&self.to_flat_records(), output)
    }

    pub fn to_csv_string(&self) -> Result<String, ExportError> {
        let bytes = self.write_csv(Vec::new())?;
        Ok(String::from_utf8(bytes)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultPage {
    pub run_id: RunId,
    pub summary: ResultSummary,
    pub query: ResultQuery,
    /// Candidates passing the filter before `limit` is applied.
    pub matching: usize,
    pub rows: Vec<ResultRow>,
}
