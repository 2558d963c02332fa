use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use vf_detector::config::{AppConfig, EvidenceConfig};
use vf_detector::error::AppError;
use vf_detector::workflows::analysis::{
    AnalysisRun, AnalysisService, RepositoryError, RunId, RunRepository,
};
use vf_detector::workflows::manifest::{EvidenceManifest, ManifestBackend};

pub(crate) type DetectorService = AnalysisService<ManifestBackend, InMemoryRunRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRunRepository {
    runs: Arc<Mutex<HashMap<RunId, AnalysisRun>>>,
}

impl InMemoryRunRepository {
    fn guard(&self) -> Result<MutexGuard<'_, HashMap<RunId, AnalysisRun>>, RepositoryError> {
        self.runs
            .lock()
            .map_err(|_| RepositoryError::Unavailable("run store lock poisoned".to_string()))
    }
}

impl RunRepository for InMemoryRunRepository {
    fn insert(&self, run: AnalysisRun) -> Result<AnalysisRun, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(run.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(run.id().clone(), run.clone());
        Ok(run)
    }

    fn update(&self, run: AnalysisRun) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(run.id()) {
            guard.insert(run.id().clone(), run);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &RunId) -> Result<Option<AnalysisRun>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }
}

/// Backend replaying the configured manifest. Without one every extraction
/// comes back empty, which fails the run.
pub(crate) fn evidence_backend(config: &EvidenceConfig) -> Result<ManifestBackend, AppError> {
    match config.manifest.as_deref() {
        Some(path) => load_manifest(path),
        None => {
            warn!("no evidence manifest configured (APP_EVIDENCE_MANIFEST); every run will fail at extraction");
            Ok(ManifestBackend::default())
        }
    }
}

pub(crate) fn load_manifest(path: &Path) -> Result<ManifestBackend, AppError> {
    let manifest = EvidenceManifest::from_path(path)?;
    info!(
        path = %path.display(),
        candidates = manifest.candidates.len(),
        "loaded evidence manifest"
    );
    Ok(ManifestBackend::new(manifest))
}

pub(crate) fn build_service(
    config: &AppConfig,
    backend: ManifestBackend,
) -> Arc<DetectorService> {
    Arc::new(AnalysisService::new(
        Arc::new(backend),
        Arc::new(InMemoryRunRepository::default()),
        &config.pipeline,
    ))
}
