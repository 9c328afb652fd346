pub mod health;
pub mod jobs;
pub mod metrics;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::app_state::AppState;
use crate::services::orchestrator::OrchestratorError;

/// JSON error body, `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error returned by route handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Not found",
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        let (status, message) = match &err {
            OrchestratorError::InvalidJson => (StatusCode::BAD_REQUEST, "Invalid JSON"),
            OrchestratorError::NotFound(_) => (StatusCode::NOT_FOUND, "Job not found"),
            OrchestratorError::AlreadyRunning(_) => (StatusCode::CONFLICT, "Job already running"),
            OrchestratorError::Queue(e) => {
                tracing::error!(error = %e, "Queue error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Any route or method the router does not know.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

/// Build the API router. `/metrics` is mounted separately by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/jobs", post(jobs::submit_job).get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/run", post(jobs::run_job))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(state)
}
