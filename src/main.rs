//! Tinh Nhanh · math practice backend
//!
//! - Axum HTTP + WebSocket API
//! - Problem generation (integers, fractions, percentages, expressions) and answer checking
//! - Rate-limited narration through Gemini text-to-speech (optional)
//! - History + leaderboard persisted as JSON files
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   GEMINI_API_KEY    : enables narration if present (API_KEY is accepted too)
//!   GEMINI_BASE_URL   : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_TTS_MODEL  : default "gemini-2.5-flash-preview-tts"
//!   DATA_DIR          : where history.json / scores.json live (default ./data)
//!   APP_CONFIG_PATH   : path to TOML config (narration + quiz settings)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod checker;
mod config;
mod domain;
mod expr;
mod gemini;
mod generator;
mod logic;
mod narration;
mod playback;
mod protocol;
mod routes;
mod session;
mod state;
mod store;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: store, narration worker, audio fan-out, config.
  let state = Arc::new(AppState::new().await?);

  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "tinhnhanh_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "tinhnhanh_backend", error = %e, "Failed to listen for shutdown signal");
  }
  info!(target: "tinhnhanh_backend", "Shutting down");
}
