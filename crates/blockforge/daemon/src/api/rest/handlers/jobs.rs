//! Job status handler

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use blockforge_queue::{JobStatus, StatusLookup};
use blockforge_types::JobId;

/// Get the status of a job. Unknown ids are 404; failed jobs are 200 with
/// `state: "failed"`.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobStatus>> {
    let job_id = JobId::from(id.as_str());
    match state.status.get_status(&job_id).await? {
        StatusLookup::Found(status) => Ok(Json(status)),
        StatusLookup::NotFound => Err(ApiError::NotFound(format!("Job {} not found", id))),
    }
}
