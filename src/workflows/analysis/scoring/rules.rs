use super::super::domain::{EvidenceBundle, EvidenceKind, Reading};
use super::config::ScoringConfig;
use super::ScoreComponent;

pub(crate) struct PointBreakdown {
    pub ml: u8,
    pub blast: u8,
    pub hmm: u8,
    pub signal: u8,
}

pub(crate) fn score_evidence(
    evidence: &EvidenceBundle,
    config: &ScoringConfig,
) -> (Vec<ScoreComponent>, PointBreakdown) {
    let mut components = Vec::with_capacity(4);

    let ml = match &evidence.ml_probability {
        Reading::Observed(probability) if *probability >= config.ml_strong_threshold => {
            components.push(component(
                EvidenceKind::MlProbability,
                config.ml_strong_points,
                format!(
                    "probability {:.3} at or above {:.2}",
                    probability, config.ml_strong_threshold
                ),
            ));
            config.ml_strong_points
        }
        Reading::Observed(probability) if *probability >= config.ml_putative_threshold => {
            components.push(component(
                EvidenceKind::MlProbability,
                config.ml_putative_points,
                format!(
                    "probability {:.3} at or above {:.2}",
                    probability, config.ml_putative_threshold
                ),
            ));
            config.ml_putative_points
        }
        Reading::Observed(probability) => {
            components.push(component(
                EvidenceKind::MlProbability,
                0,
                format!(
                    "probability {:.3} below {:.2}",
                    probability, config.ml_putative_threshold
                ),
            ));
            0
        }
        other => {
            components.push(not_evaluated(EvidenceKind::MlProbability, other));
            0
        }
    };

    let blast = match &evidence.blast_hit {
        Reading::Observed(Some(hit))
            if !hit.evalue.is_finite() || hit.evalue > config.homology_max_evalue =>
        {
            components.push(component(
                EvidenceKind::Homology,
                0,
                format!(
                    "e-value {:.1e} not within cutoff {:.1e}",
                    hit.evalue, config.homology_max_evalue
                ),
            ));
            0
        }
        Reading::Observed(Some(hit)) => {
            let tier = config
                .homology_tiers
                .iter()
                .find(|tier| hit.identity_percent >= tier.min_identity_percent);
            match tier {
                Some(tier) => {
                    components.push(component(
                        EvidenceKind::Homology,
                        tier.points,
                        format!(
                            "{:.1}% identity (>= {:.0}%), e-value {:.1e}",
                            hit.identity_percent, tier.min_identity_percent, hit.evalue
                        ),
                    ));
                    tier.points
                }
                None => {
                    components.push(component(
                        EvidenceKind::Homology,
                        0,
                        format!(
                            "{:.1}% identity below every homology tier",
                            hit.identity_percent
                        ),
                    ));
                    0
                }
            }
        }
        Reading::Observed(None) => {
            components.push(component(
                EvidenceKind::Homology,
                0,
                "no significant hit".to_string(),
            ));
            0
        }
        other => {
            components.push(not_evaluated(EvidenceKind::Homology, other));
            0
        }
    };

    let hmm = flag_points(
        &mut components,
        EvidenceKind::Domain,
        &evidence.hmm_hit,
        config.domain_points,
        "virulence-associated domain detected",
        "no virulence-associated domain",
    );

    let signal = flag_points(
        &mut components,
        EvidenceKind::Secretion,
        &evidence.signal_peptide,
        config.secretion_points,
        "secretion signal detected",
        "no secretion signal",
    );

    (
        components,
        PointBreakdown {
            ml,
            blast,
            hmm,
            signal,
        },
    )
}

fn flag_points(
    components: &mut Vec<ScoreComponent>,
    evidence: EvidenceKind,
    reading: &Reading<bool>,
    points: u8,
    present: &str,
    absent: &str,
) -> u8 {
    match reading {
        Reading::Observed(true) => {
            components.push(component(evidence, points, present.to_string()));
            points
        }
        Reading::Observed(false) => {
            components.push(component(evidence, 0, absent.to_string()));
            0
        }
        other => {
            components.push(not_evaluated(evidence, other));
            0
        }
    }
}

fn not_evaluated<T>(evidence: EvidenceKind, reading: &Reading<T>) -> ScoreComponent {
    let notes = match reading.unavailable_reason() {
        Some(reason) => format!("not evaluated: {reason}"),
        None => "not evaluated".to_string(),
    };
    ScoreComponent {
        evidence,
        points: 0,
        evaluated: false,
        notes,
    }
}

fn component(evidence: EvidenceKind, points: u8, notes: String) -> ScoreComponent {
    ScoreComponent {
        evidence,
        points,
        evaluated: true,
        notes,
    }
}
