mod audio_routes;
mod chat_routes;
pub mod state;

pub use state::ServerState;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tower_http::services::ServeDir;
use tracing::info;

use audio_routes::audio_routes;
use chat_routes::chat_routes;

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the application router.
pub fn app(state: ServerState) -> Router {
    let api = Router::new().merge(audio_routes()).merge(chat_routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest_service("/processed", ServeDir::new(&state.processed_dir))
        .with_state(state)
}

/// Bind and serve until the listener fails or the process is stopped.
pub async fn run_server(state: ServerState, port: u16) -> Result<()> {
    let router = app(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    axum::serve(listener, router)
        .await
        .context("HTTP server error")
}
