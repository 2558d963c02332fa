use super::super::domain::{AnalysisStage, RunId, RunStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// `(stage, progress)` notification emitted at every stage boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub run_id: RunId,
    pub stage: AnalysisStage,
    pub stage_label: &'static str,
    pub description: &'static str,
    pub progress_percent: u8,
    pub status: RunStatus,
    pub emitted_at: DateTime<Utc>,
}

/// Anything that wants to follow a run: UI bridges, loggers, test harnesses.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Writes every progress event to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressObserver;

impl ProgressObserver for TracingProgressObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        info!(
            run_id = %event.run_id,
            stage = event.stage_label,
            progress = event.progress_percent,
            status = event.status.label(),
            "{}",
            event.description
        );
    }
}

/// Cooperative cancellation flag, checked by the orchestrator between stages.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    requested: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
