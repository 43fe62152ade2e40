//! Source preview handlers: generation and static validation, no compiler

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use blockforge_codegen::{generate_source, GeneratedSource, ValidationOutcome};
use blockforge_types::{Block, TargetLanguage};
use serde::{Deserialize, Serialize};

/// Generate request
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub blocks: Vec<Block>,
    pub target: TargetLanguage,
}

/// Generate response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub source: GeneratedSource,
    pub source_hash: String,
}

/// Render a block list. Lists without an enabled base block render the
/// fixed placeholder rather than an error.
pub async fn generate(
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let Json(request) = payload?;
    let source = generate_source(&request.blocks, request.target);
    let source_hash = source.source_hash();

    tracing::debug!(
        target_language = %request.target,
        blocks = request.blocks.len(),
        contract = %source.contract_name,
        "Generated source preview"
    );

    Ok(Json(GenerateResponse {
        source,
        source_hash,
    }))
}

/// Validate request
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub source: String,
    pub target: TargetLanguage,
}

/// Run the static gate. A rejected source is a normal 200 answer.
pub async fn validate_source(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> ApiResult<Json<ValidationOutcome>> {
    let Json(request) = payload?;
    Ok(Json(state.validator.validate(&request.source, request.target)))
}
