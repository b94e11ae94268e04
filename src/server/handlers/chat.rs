use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect};
use axum::Form;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::server::render::render_page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

/// Empty chat page. No session exists until the first message is posted.
pub async fn index() -> impl IntoResponse {
    Html(render_page(None, &[]))
}

/// First message of a new conversation: opens a session, answers, redirects to it.
pub async fn start_chat(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ChatForm>,
) -> Result<impl IntoResponse, ApiError> {
    if form.message.is_empty() {
        return Ok(Redirect::to("/"));
    }

    let session_id = state.sessions.create().await;
    state
        .pipeline
        .submit_to(&state.sessions, &session_id, &form.message)
        .await?;
    Ok(Redirect::to(&format!("/chat/{}", session_id)))
}

pub async fn chat_page(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let turns = state
        .sessions
        .turns(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    Ok(Html(render_page(Some(&session_id), &turns)))
}

/// An empty field is not a submission; anything else, whitespace included, is.
pub async fn submit_message(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Form(form): Form<ChatForm>,
) -> Result<impl IntoResponse, ApiError> {
    if form.message.is_empty() {
        if !state.sessions.exists(&session_id).await {
            return Err(ApiError::NotFound("Session not found".to_string()));
        }
    } else {
        state
            .pipeline
            .submit_to(&state.sessions, &session_id, &form.message)
            .await?;
    }
    Ok(Redirect::to(&format!("/chat/{}", session_id)))
}
