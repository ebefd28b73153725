//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (practice sessions + narration audio)
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/problem", get(http::http_get_problem))
        .route("/api/v1/check", post(http::http_post_check))
        .route("/api/v1/speak", post(http::http_post_speak))
        .route("/api/v1/history", get(http::http_get_history))
        .route("/api/v1/leaderboard", get(http::http_get_leaderboard))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::narration::{SpeechSynthesizer, TtsError};
    use crate::store::Store;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct SilentSynth;

    #[async_trait]
    impl SpeechSynthesizer for SilentSynth {
        async fn synthesize(&self, _prompt: &str) -> Result<Vec<u8>, TtsError> {
            Err(TtsError::MissingCredential)
        }
    }

    async fn app(dir: &std::path::Path) -> Router {
        let store = Store::open(dir).await;
        let state = AppState::from_parts(AppConfig::default(), store, Arc::new(SilentSynth));
        build_router(Arc::new(state))
    }

    async fn json(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn problem_then_check() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let res = app
            .clone()
            .oneshot(
                Request::get("/api/v1/problem?topic=fraction&difficulty=easy")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let problem = json(res).await;
        let display = problem["answerDisplay"].as_str().unwrap().to_string();
        let answer = problem["answer"].as_f64().unwrap();

        let body = serde_json::json!({ "answer": display, "correctAnswer": answer }).to_string();
        let res = app
            .oneshot(
                Request::post("/api/v1/check")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json(res).await["correct"], true);
    }

    #[tokio::test]
    async fn unknown_topic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let res = app(dir.path())
            .await
            .oneshot(
                Request::get("/api/v1/problem?topic=algebra&difficulty=easy")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn speak_is_accepted_even_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let res = app(dir.path())
            .await
            .oneshot(
                Request::post("/api/v1/speak")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"xin chào"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn empty_leaderboard_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let res = app
            .clone()
            .oneshot(
                Request::get("/api/v1/leaderboard?sort=user&direction=ascending")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json(res).await["entries"], serde_json::json!([]));

        let res = app
            .oneshot(Request::get("/api/v1/history?user=an").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json(res).await["entries"], serde_json::json!([]));
    }
}
