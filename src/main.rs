use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use incident_decision_bot::core::config::{AppPaths, ConfigService};
use incident_decision_bot::core::logging;
use incident_decision_bot::server;
use incident_decision_bot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    let config = ConfigService::new(paths.clone());
    let settings = config
        .load_settings()
        .with_context(|| format!("Invalid configuration in {}", config.config_path().display()))?;
    logging::init(&paths, &settings.logging);

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(settings.server.port);
    let bind_addr = format!("{}:{}", settings.server.host, port);

    let state = AppState::initialize(config, settings).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("DECISION_BOT_URL=http://{}", addr);
    tracing::info!(
        "Listening on {} ({} documents, index {})",
        addr,
        state.document_count,
        if state.index.is_some() { "ready" } else { "unavailable" }
    );

    let app: Router = server::router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
