use super::config::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Confidence label derived from a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Non-VF")]
    NonVf,
    #[serde(rename = "Low-confidence VF")]
    LowConfidence,
    #[serde(rename = "Putative VF")]
    Putative,
    #[serde(rename = "High-confidence VF")]
    HighConfidence,
}

impl Classification {
    /// Highest confidence first, matching how result summaries are listed.
    pub const fn ordered() -> [Self; 4] {
        [
            Self::HighConfidence,
            Self::Putative,
            Self::LowConfidence,
            Self::NonVf,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::HighConfidence => "High-confidence VF",
            Self::Putative => "Putative VF",
            Self::LowConfidence => "Low-confidence VF",
            Self::NonVf => "Non-VF",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::HighConfidence => "high_confidence",
            Self::Putative => "putative",
            Self::LowConfidence => "low_confidence",
            Self::NonVf => "non_vf",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ordered()
            .into_iter()
            .find(|classification| {
                classification.label().eq_ignore_ascii_case(trimmed)
                    || classification.key().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| format!("unknown classification '{trimmed}'"))
    }
}

pub(crate) fn classify(total_score: u8, config: &ScoringConfig) -> Classification {
    if total_score >= config.high_confidence_min {
        Classification::HighConfidence
    } else if total_score >= config.putative_min {
        Classification::Putative
    } else if total_score >= config.low_confidence_min {
        Classification::LowConfidence
    } else {
        Classification::NonVf
    }
}
