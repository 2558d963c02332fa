use crate::infra::{build_service, evidence_backend, load_manifest};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use vf_detector::config::AppConfig;
use vf_detector::error::AppError;
use vf_detector::workflows::analysis::{
    AnalysisRun, ClassificationFilter, ProgressEvent, ResultQuery, ResultRow, ResultSummary,
    ScoringProfile, SortDirection, SortKey, StageOutcome, StageRecord,
};

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Genome assembly to analyze (.fasta, .fa or .fna)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Evidence manifest with precomputed readings (overrides APP_EVIDENCE_MANIFEST)
    #[arg(long)]
    pub(crate) evidence: Option<PathBuf>,
    /// Scoring profile: standard or legacy (overrides APP_SCORING_PROFILE)
    #[arg(long)]
    pub(crate) profile: Option<ScoringProfile>,
    /// Only list candidates with this classification, e.g. putative or "High-confidence VF"
    #[arg(long, default_value = "all")]
    pub(crate) classification: ClassificationFilter,
    /// Column to order the listing by: total_score, ml_points or blast_points
    #[arg(long, default_value = "total_score")]
    pub(crate) sort: SortKey,
    /// asc or desc
    #[arg(long, default_value = "desc")]
    pub(crate) direction: SortDirection,
    /// Maximum number of rows to print
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Write the full result set as CSV to this path
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct AnalysisReport<'a> {
    run_id: String,
    filename: &'a str,
    profile: &'static str,
    finished_at: Option<DateTime<Utc>>,
    stages: &'a [StageRecord],
    summary: ResultSummary,
    query: ResultQuery,
    rows: Vec<ResultRow>,
}

pub(crate) async fn run_analysis(args: AnalyzeArgs) -> Result<(), AppError> {
    let AnalyzeArgs {
        input,
        evidence,
        profile,
        classification,
        sort,
        direction,
        limit,
        export,
        json,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(profile) = profile {
        config.pipeline.scoring_profile = profile;
    }
    let backend = match evidence {
        Some(path) => load_manifest(&path)?,
        None => evidence_backend(&config.evidence)?,
    };
    let service = build_service(&config, backend);

    let fasta = std::fs::read_to_string(&input)?;
    let filename = display_name(&input);

    let quiet = json;
    let observer = move |event: &ProgressEvent| {
        if !quiet {
            println!("[{:>3}%] {}", event.progress_percent, event.description);
        }
    };
    let run = service.analyze(&filename, &fasta, &observer).await?;

    let query = ResultQuery {
        classification,
        sort,
        direction,
        limit,
    };
    let Some(results) = run.results() else {
        println!("Run {} ended as {} without results", run.id(), run.status().label());
        return Ok(());
    };
    let summary = results.summary();
    let rows = results.query(&query).rows();

    if json {
        let report = AnalysisReport {
            run_id: run.id().to_string(),
            filename: &filename,
            profile: config.pipeline.scoring_profile.label(),
            finished_at: run.finished_at(),
            stages: run.stage_log(),
            summary,
            query,
            rows,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Report unavailable: {err}"),
        }
    } else {
        render_report(&run, &summary, &rows, config.pipeline.scoring_profile);
    }

    if let Some(path) = export {
        let csv = service.export_csv(run.id())?;
        std::fs::write(&path, csv)?;
        if !json {
            println!("\nExported {} candidates to {}", results.len(), path.display());
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn render_report(
    run: &AnalysisRun,
    summary: &ResultSummary,
    rows: &[ResultRow],
    profile: ScoringProfile,
) {
    let input = run.input().summary();
    println!(
        "\nVirulence factor analysis {} ({} profile)",
        run.id(),
        profile.label()
    );
    println!(
        "- Input: {} | {} contigs | {} bp",
        input.filename, input.contigs, input.total_bases
    );
    if let Some(finished) = run.finished_at() {
        println!(
            "- Finished: {}",
            finished.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!("Stages:");
    for record in run.stage_log() {
        match &record.outcome {
            StageOutcome::Completed => println!("  - {}: completed", record.stage.description()),
            StageOutcome::Degraded { reason } | StageOutcome::Failed { reason } => println!(
                "  - {}: {} ({})",
                record.stage.description(),
                record.outcome.label(),
                reason
            ),
        }
    }

    println!(
        "Summary: {} candidates | mean score {:.2}",
        summary.total, summary.mean_score
    );
    for entry in &summary.counts {
        println!("  - {}: {}", entry.classification, entry.count);
    }
    if let Some(top) = &summary.top_candidate {
        println!(
            "  Top candidate: {} (score {}, {})",
            top.id, top.total_score, top.classification
        );
    }

    if rows.is_empty() {
        println!("\nNo candidates match the requested filter");
        return;
    }

    println!(
        "\n{:<16} {:>5} {:<20} {:>3} {:>5} {:>3} {:>3} {:>7} {:>7}",
        "ORF", "Score", "Classification", "ML", "BLAST", "HMM", "SP", "ML prob", "Length"
    );
    for row in rows {
        let probability = row
            .ml_probability
            .map(|value| format!("{value:.3}"))
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{:<16} {:>5} {:<20} {:>3} {:>5} {:>3} {:>3} {:>7} {:>7}",
            row.orf_id.0,
            row.vf_score,
            row.classification.label(),
            row.ml_score,
            row.blast_score,
            row.hmm_score,
            row.signalp_score,
            probability,
            row.length
        );
    }
}
