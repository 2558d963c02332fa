use super::domain::AnalysisStage;

/// Progress values reported when a stage starts and when its result is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCheckpoint {
    pub stage: AnalysisStage,
    pub started: u8,
    pub completed: u8,
}

/// Ordered stage plan with progress checkpoints. 100 is reserved for the
/// completed run and never appears here.
#[derive(Debug, Clone)]
pub struct PipelineBlueprint {
    checkpoints: Vec<StageCheckpoint>,
}

impl PipelineBlueprint {
    pub fn standard() -> Self {
        Self {
            checkpoints: standard_checkpoints(),
        }
    }

    pub fn checkpoint(&self, stage: AnalysisStage) -> StageCheckpoint {
        self.checkpoints
            .iter()
            .copied()
            .find(|checkpoint| checkpoint.stage == stage)
            .unwrap_or(StageCheckpoint {
                stage,
                started: 0,
                completed: 0,
            })
    }

    pub fn checkpoints(&self) -> &[StageCheckpoint] {
        &self.checkpoints
    }
}

impl Default for PipelineBlueprint {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_checkpoints() -> Vec<StageCheckpoint> {
    vec![
        StageCheckpoint {
            stage: AnalysisStage::ExtractCandidates,
            started: 5,
            completed: 20,
        },
        StageCheckpoint {
            stage: AnalysisStage::ScoreMl,
            started: 25,
            completed: 35,
        },
        StageCheckpoint {
            stage: AnalysisStage::SearchHomology,
            started: 40,
            completed: 55,
        },
        StageCheckpoint {
            stage: AnalysisStage::SearchDomains,
            started: 60,
            completed: 70,
        },
        StageCheckpoint {
            stage: AnalysisStage::DetectSignal,
            started: 75,
            completed: 85,
        },
        StageCheckpoint {
            stage: AnalysisStage::Aggregate,
            started: 90,
            completed: 95,
        },
    ]
}
