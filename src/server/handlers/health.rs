use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

const BACKEND_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backend_reachable =
        match tokio::time::timeout(BACKEND_PROBE_TIMEOUT, state.provider.health_check()).await {
            Ok(Ok(reachable)) => reachable,
            Ok(Err(err)) => {
                tracing::debug!("Backend health check failed: {}", err);
                false
            }
            Err(_) => false,
        };

    Json(json!({
        "status": "ok",
        "documents": state.document_count,
        "index_available": state.index.is_some(),
        "indexed_documents": state.index.as_ref().map_or(0, |index| index.len()),
        "provider": state.provider.name(),
        "backend_reachable": backend_reachable,
        "chat_model": state.settings.llm.chat_model,
        "embedding_model": state.settings.llm.embedding_model,
        "sessions": state.sessions.count().await,
    }))
}
