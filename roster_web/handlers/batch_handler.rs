use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roster_app::jobs::{BatchJob, JobStatus, JobType};

use crate::{
    handlers::helpers::{ApiError, MessageResponse},
    http::AppState,
};

#[derive(Debug, Deserialize)]
pub struct BatchAddRequest {
    pub source_collection_id: Uuid,
    pub target_collection_id: Uuid,
    pub company_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub collection_id: Uuid,
    pub company_ids: Vec<i32>,
}

/// Snapshot of a job as polled by clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub job_type: JobType,
    pub total_count: i32,
    pub processed_count: i32,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

impl From<BatchJob> for JobStatusResponse {
    fn from(job: BatchJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            job_type: job.job_type(),
            total_count: job.total_count,
            processed_count: job.processed_count,
            cancel_requested: job.cancel_requested,
            created_at: job.created_at,
            updated_at: job.updated_at,
            error_message: job.error_message,
        }
    }
}

/// POST /batch/add-companies
pub async fn add_companies(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<BatchAddRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let job = state
        .supervisor
        .submit_add(
            body.source_collection_id,
            body.target_collection_id,
            body.company_ids,
        )
        .await?;

    Ok(Json(JobStatusResponse::from(job)).into_response())
}

/// POST /batch/delete-companies
pub async fn delete_companies(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<BatchDeleteRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let job = state
        .supervisor
        .submit_delete(body.collection_id, body.company_ids)
        .await?;

    Ok(Json(JobStatusResponse::from(job)).into_response())
}

/// GET /batch/jobs/{job_id}/status
pub async fn job_status(
    State(state): State<AppState>,
    WithRejection(Path(job_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Response, ApiError> {
    let job = state.supervisor.get_status(job_id).await?;
    Ok(Json(JobStatusResponse::from(job)).into_response())
}

/// POST /batch/jobs/{job_id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    WithRejection(Path(job_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Response, ApiError> {
    state.supervisor.cancel(job_id).await?;
    Ok(Json(MessageResponse::new("Cancellation requested")).into_response())
}
