use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::RunId;
use super::pipeline::{AnalysisBackend, PipelineError};
use super::repository::{RepositoryError, RunRepository};
use super::results::ResultQuery;
use super::service::{AnalysisService, AnalysisServiceError};

/// Upload payload: the original file name plus its FASTA text.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnalysisRequest {
    pub filename: String,
    pub fasta: String,
}

/// Raw query string for result views; parsed with the view types' `FromStr`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultParams {
    pub classification: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub limit: Option<usize>,
}

impl ResultParams {
    pub fn to_query(&self) -> Result<ResultQuery, String> {
        let mut query = ResultQuery::default();
        if let Some(classification) = &self.classification {
            query.classification = classification.parse()?;
        }
        if let Some(sort) = &self.sort {
            query.sort = sort.parse()?;
        }
        if let Some(direction) = &self.direction {
            query.direction = direction.parse()?;
        }
        query.limit = self.limit;
        Ok(query)
    }
}

/// Router builder exposing run submission, status, cancellation and results.
pub fn analysis_router<B, R>(service: Arc<AnalysisService<B, R>>) -> Router
where
    B: AnalysisBackend + 'static,
    R: RunRepository + 'static,
{
    Router::new()
        .route("/api/v1/analysis/runs", post(submit_handler::<B, R>))
        .route("/api/v1/analysis/runs/:run_id", get(status_handler::<B, R>))
        .route(
            "/api/v1/analysis/runs/:run_id/cancel",
            post(cancel_handler::<B, R>),
        )
        .route(
            "/api/v1/analysis/runs/:run_id/results",
            get(results_handler::<B, R>),
        )
        .route(
            "/api/v1/analysis/runs/:run_id/export",
            get(export_handler::<B, R>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<B, R>(
    State(service): State<Arc<AnalysisService<B, R>>>,
    axum::Json(request): axum::Json<SubmitAnalysisRequest>,
) -> Response
where
    B: AnalysisBackend + 'static,
    R: RunRepository + 'static,
{
    match service.submit(&request.filename, &request.fasta) {
        Ok(view) => (StatusCode::ACCEPTED, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<B, R>(
    State(service): State<Arc<AnalysisService<B, R>>>,
    Path(run_id): Path<String>,
) -> Response
where
    B: AnalysisBackend + 'static,
    R: RunRepository + 'static,
{
    match service.status(&RunId(run_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<B, R>(
    State(service): State<Arc<AnalysisService<B, R>>>,
    Path(run_id): Path<String>,
) -> Response
where
    B: AnalysisBackend + 'static,
    R: RunRepository + 'static,
{
    match service.cancel(&RunId(run_id)) {
        Ok(view) => (StatusCode::ACCEPTED, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn results_handler<B, R>(
    State(service): State<Arc<AnalysisService<B, R>>>,
    Path(run_id): Path<String>,
    Query(params): Query<ResultParams>,
) -> Response
where
    B: AnalysisBackend + 'static,
    R: RunRepository + 'static,
{
    let query = match params.to_query() {
        Ok(query) => query,
        Err(message) => {
            let payload = json!({ "error": message });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    match service.results(&RunId(run_id), &query) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<B, R>(
    State(service): State<Arc<AnalysisService<B, R>>>,
    Path(run_id): Path<String>,
) -> Response
where
    B: AnalysisBackend + 'static,
    R: RunRepository + 'static,
{
    let id = RunId(run_id);
    match service.export_csv(&id) {
        Ok(body) => {
            let disposition = format!("attachment; filename=\"{id}_vf_results.csv\"");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: AnalysisServiceError) -> Response {
    let status = match &error {
        AnalysisServiceError::Pipeline(PipelineError::InvalidInput(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalysisServiceError::Pipeline(PipelineError::RunFinalized(_))
        | AnalysisServiceError::RunNotFinished(_)
        | AnalysisServiceError::NoResults { .. }
        | AnalysisServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AnalysisServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AnalysisServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AnalysisServiceError::Pipeline(_) | AnalysisServiceError::Export(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
