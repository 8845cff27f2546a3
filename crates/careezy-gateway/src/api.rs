//! Coach session endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use careezy_agents::{SessionDetail, TurnOutcome};
use careezy_common::{CoachSession, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::SharedState;

const CHAT_FAILED: &str = "Failed to get chat response";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
    pub session_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: SessionId,
}

impl From<TurnOutcome> for ChatResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            response: outcome.assistant_text,
            session_id: outcome.session_id,
        }
    }
}

/// POST /api/coach/sessions
pub async fn create_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CoachSession>), ApiError> {
    let session = state
        .coach
        .create_session(&user.id, body.title.as_deref(), body.session_type.as_deref())
        .await
        .map_err(ApiError::context("Failed to create session"))?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/coach/sessions
pub async fn list_sessions(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<CoachSession>>, ApiError> {
    let sessions = state
        .coach
        .list_sessions(&user.id)
        .await
        .map_err(ApiError::context("Failed to fetch sessions"))?;
    Ok(Json(sessions))
}

/// GET /api/coach/sessions/{id}
pub async fn get_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    let detail = state
        .coach
        .get_session(&user.id, &SessionId::new(id))
        .await
        .map_err(ApiError::context("Failed to fetch session"))?;
    Ok(Json(detail))
}

/// DELETE /api/coach/sessions/{id}
pub async fn archive_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .coach
        .archive_session(&user.id, &SessionId::new(id))
        .await
        .map_err(ApiError::context("Failed to delete session"))?;
    Ok(Json(json!({ "message": "Session archived successfully" })))
}

/// POST /api/coach/sessions/{id}/messages
pub async fn send_message(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = SessionId::new(id);
    let outcome = state
        .coach
        .send_turn(&user.id, Some(&session_id), &body.message)
        .await
        .map_err(ApiError::context(CHAT_FAILED))?;
    Ok(Json(outcome.into()))
}

/// POST /api/coach/chat
pub async fn chat(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state
        .coach
        .send_turn(&user.id, None, &body.message)
        .await
        .map_err(ApiError::context(CHAT_FAILED))?;
    Ok(Json(outcome.into()))
}
