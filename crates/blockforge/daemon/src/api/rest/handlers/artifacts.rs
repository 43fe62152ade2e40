//! Artifact retrieval handler

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use blockforge_queue::ArtifactStore;
use blockforge_types::{Artifact, ArtifactId};

/// Get a compiled artifact
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Artifact>> {
    let artifact = state
        .queue
        .artifacts()
        .get(&ArtifactId::from(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Artifact {} not found", id)))?;

    Ok(Json(artifact))
}
