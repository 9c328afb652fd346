use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::models::job::{JobId, JobRecord};
use crate::routes::ApiError;

/// Response for GET /jobs.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub items: Vec<JobRecord>,
}

/// POST /jobs: queue a job. The whole JSON body becomes the payload.
pub async fn submit_job(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<JobRecord>), ApiError> {
    let job = state.orchestrator.submit(&body).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// GET /jobs: every job in insertion order.
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    Json(JobListResponse {
        items: state.orchestrator.list().await,
    })
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let job = state.orchestrator.get(&JobId::from(id.as_str())).await?;
    Ok(Json(job))
}

/// POST /jobs/{id}/run: run the job's pipeline and return the finished record.
pub async fn run_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let job = state.orchestrator.run(&JobId::from(id.as_str())).await?;
    Ok(Json(job))
}
