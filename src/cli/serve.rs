use crate::api::{AppState, app_router};
use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use tracing::{info, warn};

pub async fn run(config: &AppConfig) -> Result<()> {
    let state = AppState::from_config(config)?;
    if !state.planner.has_llm() {
        warn!("No LLM API key configured; itinerary requests will return the fallback plan");
    }
    let router = app_router(state, &config.server)?;

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
