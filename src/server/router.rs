use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, config, health, sessions};
use crate::state::AppState;

/// Creates the application router: the HTML chat pages plus the JSON API.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/", get(chat::index))
        .route("/chat", post(chat::start_chat))
        .route(
            "/chat/:session_id",
            get(chat::chat_page).post(chat::submit_message),
        )
        .route("/health", get(health::health))
        .route("/api/config", get(config::get_config))
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/:session_id/turns", get(sessions::get_turns))
        .route(
            "/api/sessions/:session_id/messages",
            post(sessions::send_message),
        )
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let origins = resolve_allowed_origins(&state.settings.server.cors_allowed_origins)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }
    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:8501".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:8501".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core::config::{AppPaths, BotSettings, ConfigService};
    use crate::dataset::documents_from_value;
    use crate::llm::mock::MockProvider;
    use crate::server::render::PAGE_TITLE;

    async fn test_state(dir: &std::path::Path, provider: MockProvider) -> Arc<AppState> {
        let config = ConfigService::new(Arc::new(AppPaths::with_dirs(
            dir.to_path_buf(),
            dir.join("user"),
        )));
        let mut settings = BotSettings::default();
        settings.llm.api_key = Some("sk-very-secret".to_string());
        let documents = documents_from_value(
            &json!({"all_data": [{"person": "X", "datas": [
                {"Incident": "فلان رخداد", "Conditions": "شرایط خاص", "Decision": "تصمیم الف"}
            ]}]}),
            "all_data",
        );
        AppState::assemble(config, settings, Arc::new(provider), documents).await
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    fn location(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn visiting_root_creates_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), MockProvider::replying("ok")).await;
        let app = router(state.clone());

        for _ in 0..20 {
            let response = app
                .clone()
                .oneshot(Request::get("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let html = body_string(response).await;
            assert!(html.contains(PAGE_TITLE));
            assert!(html.contains("action=\"/chat\""));
        }

        assert_eq!(state.sessions.count().await, 0);
    }

    #[tokio::test]
    async fn first_message_opens_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), MockProvider::replying("درود")).await;
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post("/chat")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("message=hello"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let target = location(&response);
        let id = target.trim_start_matches("/chat/").to_string();
        assert_eq!(state.sessions.count().await, 1);
        assert_eq!(state.sessions.turns(&id).await.unwrap().len(), 1);

        let page = app
            .oneshot(Request::get(target.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(page.status(), StatusCode::OK);
        assert!(body_string(page).await.contains("درود"));
    }

    #[tokio::test]
    async fn empty_first_message_goes_back_home() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), MockProvider::replying("ok")).await;

        let response = router(state.clone())
            .oneshot(
                Request::post("/chat")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("message="))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        assert_eq!(state.sessions.count().await, 0);
    }

    #[tokio::test]
    async fn form_submission_appends_and_redirects() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), MockProvider::replying("<b>bold</b> answer")).await;
        let id = state.sessions.create().await;
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post(format!("/chat/{}", id))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("message=hello"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/chat/{}", id));

        let html = body_string(
            app.oneshot(Request::get(format!("/chat/{}", id)).body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; answer"));
        assert_eq!(state.sessions.turns(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn whitespace_is_a_submission_but_empty_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), MockProvider::replying("ok")).await;
        let id = state.sessions.create().await;
        let app = router(state.clone());

        for body in ["message=", "message=+++"] {
            let response = app
                .clone()
                .oneshot(
                    Request::post(format!("/chat/{}", id))
                        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }

        let turns = state.sessions.turns(&id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user_text, "   ");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), MockProvider::replying("ok")).await);

        let response = app
            .oneshot(Request::get("/chat/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn json_api_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), MockProvider::replying("تصمیم الف")).await);

        let created = body_json(
            app.clone()
                .oneshot(Request::post("/api/sessions").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;
        let id = created["session_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::post(format!("/api/sessions/{}/messages", id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"message": "شرایط خاص"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["turn"]["bot_text"], "تصمیم الف");
        assert_eq!(outcome["documents"][0]["metadata"]["person"], "X");

        let turns = body_json(
            app.oneshot(
                Request::get(format!("/api/sessions/{}/turns", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(turns["turns"].as_array().unwrap().len(), 1);
        assert_eq!(turns["turns"][0]["user_text"], "شرایط خاص");
    }

    #[tokio::test]
    async fn empty_api_message_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), MockProvider::replying("ok")).await;
        let id = state.sessions.create().await;

        let response = router(state)
            .oneshot(
                Request::post(format!("/api/sessions/{}/messages", id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message": ""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_index_and_provider() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), MockProvider::replying("ok")).await);

        let health = body_json(
            app.oneshot(Request::get("/health").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(health["status"], "ok");
        assert_eq!(health["documents"], 1);
        assert_eq!(health["index_available"], true);
        assert_eq!(health["provider"], "mock");
        assert_eq!(health["backend_reachable"], true);
    }

    #[tokio::test]
    async fn config_endpoint_redacts_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), MockProvider::replying("ok")).await);

        let config = body_json(
            app.oneshot(Request::get("/api/config").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(config["llm"]["api_key"], "****");
        assert_eq!(config["llm"]["max_tokens"], Value::Null);
        assert_eq!(config["retrieval"]["top_k"], 10);
    }

    #[test]
    fn configured_origins_replace_local_defaults() {
        assert_eq!(resolve_allowed_origins(&[]), default_local_origins());
        assert_eq!(
            resolve_allowed_origins(&[" http://box:3000 ".to_string(), "".to_string()]),
            vec!["http://box:3000".to_string()]
        );
    }
}
