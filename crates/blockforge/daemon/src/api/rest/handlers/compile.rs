//! Compilation submission handler

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use blockforge_queue::Submission;
use blockforge_types::JobId;
use serde::{Deserialize, Serialize};

/// Compile response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    pub job_id: JobId,
    /// Correlates this submission with daemon logs
    pub request_id: String,
}

/// Accept a compilation request. Returns once the job is persisted and
/// enqueued; compilation happens on the worker pool.
pub async fn submit_compile(
    State(state): State<AppState>,
    payload: Result<Json<Submission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CompileResponse>)> {
    let Json(submission) = payload?;
    let request_id = uuid::Uuid::new_v4().to_string();
    let kind = submission.kind;

    let job_id = state
        .queue
        .submit_request(submission)
        .await
        .inspect_err(|e| {
            tracing::info!(request_id = %request_id, kind = %kind, error = %e, "Rejected compile request");
        })?;

    tracing::info!(request_id = %request_id, job_id = %job_id, kind = %kind, "Accepted compile request");

    Ok((
        StatusCode::ACCEPTED,
        Json(CompileResponse { job_id, request_id }),
    ))
}
