//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(topic = ?q.topic, difficulty = ?q.difficulty))]
pub async fn http_get_problem(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ProblemQuery>,
) -> impl IntoResponse {
  match serve_problem(&state, q.topic, q.difficulty) {
    Ok(problem) => {
      info!(target: "practice", question = %problem.question_text, "HTTP problem served");
      Json(problem).into_response()
    }
    Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorOut { error: e.to_string() })).into_response(),
  }
}

#[instrument(level = "info", skip(body), fields(answer_len = body.answer.len()))]
pub async fn http_post_check(Json(body): Json<CheckIn>) -> impl IntoResponse {
  if !body.correct_answer.is_finite() {
    return (StatusCode::BAD_REQUEST, Json(ErrorOut { error: "correctAnswer must be finite".into() })).into_response();
  }
  let correct = check_only(&body.answer, body.correct_answer);
  info!(target: "practice", %correct, "HTTP answer checked");
  Json(CheckOut { correct }).into_response()
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_speak(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SpeakIn>,
) -> impl IntoResponse {
  if body.text.trim().is_empty() {
    return (StatusCode::BAD_REQUEST, Json(ErrorOut { error: "text must not be empty".into() })).into_response();
  }
  narrate(&state, &body.text);
  (StatusCode::ACCEPTED, Json(SpeakOut { queued: true })).into_response()
}

#[instrument(level = "info", skip(state), fields(user = %q.user))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
  let entries = state.store.history_for(&q.user).await;
  info!(target: "practice", user = %q.user, count = entries.len(), "HTTP history served");
  Json(HistoryOut { entries })
}

#[instrument(level = "info", skip(state), fields(sort = ?q.sort, direction = ?q.direction))]
pub async fn http_get_leaderboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LeaderboardQuery>,
) -> impl IntoResponse {
  let entries = state.store.leaderboard(q.sort, q.direction).await;
  Json(LeaderboardOut { entries })
}
