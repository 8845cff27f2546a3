use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsRequest {
    #[serde(default)]
    pub resume_content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub resume_content: String,
}

/// POST /api/resumes/suggestions
pub async fn suggestions(
    State(state): State<SharedState>,
    AuthUser(_user): AuthUser,
    Json(body): Json<SuggestionsRequest>,
) -> Result<Json<Value>, ApiError> {
    let suggestions = state
        .resumes
        .suggestions(&body.resume_content)
        .await
        .map_err(ApiError::context("Failed to get suggestions"))?;
    Ok(Json(json!({ "suggestions": suggestions })))
}

/// POST /api/resumes/match
pub async fn match_reasoning(
    State(state): State<SharedState>,
    AuthUser(_user): AuthUser,
    Json(body): Json<MatchRequest>,
) -> Result<Json<Value>, ApiError> {
    let reasoning = state
        .resumes
        .match_reasoning(&body.job_description, &body.resume_content)
        .await
        .map_err(ApiError::context("Failed to generate match reasoning"))?;
    Ok(Json(json!({ "reasoning": reasoning })))
}
