use super::common::*;

use crate::workflows::analysis::domain::CandidateId;
use crate::workflows::analysis::results::{
    ClassificationFilter, ResultQuery, SortDirection, SortKey, EXPORT_HEADER,
};
use crate::workflows::analysis::scoring::Classification;

fn ids(values: Vec<&CandidateId>) -> Vec<String> {
    values.into_iter().map(|id| id.0.clone()).collect()
}

#[test]
fn all_filter_keeps_the_whole_batch() {
    let set = result_set();
    let view = set.filter_by_classification(ClassificationFilter::All);
    assert_eq!(view.len(), set.len());
}

#[test]
fn label_filter_returns_only_matching_candidates() {
    let set = result_set();
    let view = set.filter_by_classification(Classification::LowConfidence.into());

    assert_eq!(ids(view.ids()), ["orf_2", "orf_4"]);
    assert!(view
        .iter()
        .all(|scored| scored.classification() == Classification::LowConfidence));
    assert_eq!(set.len(), 5, "filtering never drops candidates from the batch");
}

#[test]
fn sort_by_total_score_descending() {
    let set = result_set();
    let view = set.sort_by(SortKey::TotalScore, SortDirection::Desc);
    assert_eq!(ids(view.ids()), ["orf_1", "orf_3", "orf_4", "orf_2", "orf_5"]);
}

#[test]
fn ties_keep_batch_order_in_both_directions() {
    let set = result_set();
    let desc = ids(set.sort_by(SortKey::MlPoints, SortDirection::Desc).ids());
    let asc = ids(set.sort_by(SortKey::MlPoints, SortDirection::Asc).ids());

    assert_eq!(desc, ["orf_1", "orf_4", "orf_2", "orf_3", "orf_5"]);
    assert_eq!(asc, ["orf_3", "orf_5", "orf_2", "orf_1", "orf_4"]);
}

#[test]
fn views_compose_filter_sort_and_limit() {
    let set = result_set();
    let query = ResultQuery {
        classification: ClassificationFilter::All,
        sort: SortKey::BlastPoints,
        direction: SortDirection::Desc,
        limit: Some(2),
    };
    let view = set.query(&query);
    assert_eq!(ids(view.ids()), ["orf_1", "orf_2"]);

    let chained = set
        .all()
        .filter(Classification::LowConfidence.into())
        .sort_by(SortKey::TotalScore, SortDirection::Desc)
        .limit(1);
    assert_eq!(ids(chained.ids()), ["orf_4"]);
}

#[test]
fn page_reports_matches_before_limit() {
    let set = result_set();
    let query = ResultQuery {
        classification: ClassificationFilter::Only(Classification::LowConfidence),
        limit: Some(1),
        ..ResultQuery::default()
    };
    let page = set.page(&query);

    assert_eq!(page.matching, 2);
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].orf_id, CandidateId::from("orf_4"));
    assert_eq!(page.summary.total, 5);
}

#[test]
fn rows_expose_points_and_raw_readings() {
    let set = result_set();
    let rows = set.all().rows();

    assert_eq!(rows[0].vf_score, 10);
    assert_eq!(rows[0].blast_identity, Some(92.0));
    assert_eq!(rows[0].ml_probability, Some(0.75));
    assert!(rows[0].not_evaluated.is_empty());
    assert_eq!(rows[4].ml_probability, None);
    assert_eq!(rows[4].not_evaluated.len(), 1);
}

#[test]
fn summary_counts_every_label_in_confidence_order() {
    let summary = result_set().summary();

    let labels: Vec<Classification> = summary
        .counts
        .iter()
        .map(|entry| entry.classification)
        .collect();
    assert_eq!(labels, Classification::ordered());
    assert_eq!(summary.count(Classification::HighConfidence), 1);
    assert_eq!(summary.count(Classification::Putative), 1);
    assert_eq!(summary.count(Classification::LowConfidence), 2);
    assert_eq!(summary.count(Classification::NonVf), 1);
    assert_eq!(summary.total, 5);
    assert!((summary.mean_score - 3.6).abs() < f64::EPSILON);

    let top = summary.top_candidate.expect("top candidate");
    assert_eq!(top.id, CandidateId::from("orf_1"));
    assert_eq!(top.total_score, 10);
}

#[test]
fn flat_records_cover_the_full_batch_regardless_of_views() {
    let set = result_set();
    let _narrow = set
        .filter_by_classification(Classification::HighConfidence.into())
        .limit(1);

    let records = set.to_flat_records();
    assert_eq!(records.len(), set.len());
    assert_eq!(records[4].ml_probability, None);
}

#[test]
fn csv_export_uses_the_fixed_header_and_marks_missing_values() {
    let csv = result_set().to_csv_string().expect("csv renders");
    let mut lines = csv.lines();

    assert_eq!(lines.next(), Some(EXPORT_HEADER.join(",").as_str()));
    assert_eq!(
        lines.next(),
        Some("orf_1,10,High-confidence VF,2,4,1,0.750,303")
    );
    let last = csv.lines().last().expect("last row");
    assert_eq!(last, "orf_5,0,Non-VF,0,0,0,N/A,315");
    assert_eq!(csv.lines().count(), 6);
}

#[test]
fn query_parameters_parse_from_text() {
    assert_eq!(
        "all".parse::<ClassificationFilter>(),
        Ok(ClassificationFilter::All)
    );
    assert_eq!(
        "Putative VF".parse::<ClassificationFilter>(),
        Ok(ClassificationFilter::Only(Classification::Putative))
    );
    assert_eq!("totalScore".parse::<SortKey>(), Ok(SortKey::TotalScore));
    assert_eq!("ml_points".parse::<SortKey>(), Ok(SortKey::MlPoints));
    assert_eq!("blast".parse::<SortKey>(), Ok(SortKey::BlastPoints));
    assert_eq!("ASC".parse::<SortDirection>(), Ok(SortDirection::Asc));
    assert!("sideways".parse::<SortDirection>().is_err());
    assert!("length".parse::<SortKey>().is_err());
}
