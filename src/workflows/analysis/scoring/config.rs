use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named scoring configurations. `Standard` is the five-evidence 0-10 model,
/// `Legacy` the three-evidence 0-6 model without domain search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringProfile {
    Standard,
    Legacy,
}

impl ScoringProfile {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Legacy => "legacy",
        }
    }

    pub fn config(self) -> ScoringConfig {
        match self {
            Self::Standard => ScoringConfig::standard(),
            Self::Legacy => ScoringConfig::legacy(),
        }
    }
}

impl FromStr for ScoringProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "five_evidence" => Ok(Self::Standard),
            "legacy" | "three_evidence" => Ok(Self::Legacy),
            other => Err(format!("unknown scoring profile '{other}'")),
        }
    }
}

/// Homology points awarded at or above an identity percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomologyTier {
    pub min_identity_percent: f64,
    pub points: u8,
}

/// Every threshold the engine applies. Rules and policy read from here only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub ml_putative_threshold: f64,
    pub ml_strong_threshold: f64,
    pub ml_putative_points: u8,
    pub ml_strong_points: u8,
    pub homology_max_evalue: f64,
    /// Ordered from the highest identity requirement down.
    pub homology_tiers: Vec<HomologyTier>,
    pub domain_points: u8,
    pub secretion_points: u8,
    pub high_confidence_min: u8,
    pub putative_min: u8,
    pub low_confidence_min: u8,
}

impl ScoringConfig {
    pub fn standard() -> Self {
        Self {
            ml_putative_threshold: 0.5,
            ml_strong_threshold: 0.7,
            ml_putative_points: 1,
            ml_strong_points: 2,
            homology_max_evalue: 1e-5,
            homology_tiers: vec![HomologyTier {
                min_identity_percent: 80.0,
                points: 4,
            }],
            domain_points: 3,
            secretion_points: 1,
            high_confidence_min: 7,
            putative_min: 4,
            low_confidence_min: 1,
        }
    }

    pub fn legacy() -> Self {
        Self {
            homology_tiers: vec![
                HomologyTier {
                    min_identity_percent: 80.0,
                    points: 3,
                },
                HomologyTier {
                    min_identity_percent: 60.0,
                    points: 2,
                },
                HomologyTier {
                    min_identity_percent: 40.0,
                    points: 1,
                },
            ],
            domain_points: 0,
            high_confidence_min: 5,
            putative_min: 3,
            ..Self::standard()
        }
    }

    pub fn max_score(&self) -> u8 {
        let homology = self
            .homology_tiers
            .iter()
            .map(|tier| tier.points)
            .max()
            .unwrap_or(0);
        self.ml_strong_points
            .max(self.ml_putative_points)
            .saturating_add(homology)
            .saturating_add(self.domain_points)
            .saturating_add(self.secretion_points)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::standard()
    }
}
