use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = state.sessions.create().await;
    Json(json!({"session_id": session_id}))
}

pub async fn get_turns(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let turns = state
        .sessions
        .turns(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    Ok(Json(json!({"turns": turns})))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.message.is_empty() {
        return Err(ApiError::BadRequest("message cannot be empty".to_string()));
    }
    let outcome = state
        .pipeline
        .submit_to(&state.sessions, &session_id, &payload.message)
        .await?;
    Ok(Json(outcome))
}
