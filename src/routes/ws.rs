//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic; we reply with a single JSON message per request.
//! Narration audio is pushed to the client as it becomes available.
//!
//! A connection carries the logged-in user and at most one running session.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, error, instrument, debug, warn};

use crate::logic::*;
use crate::playback::AudioFrame;
use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::session::{Next, PracticeSession};
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Default)]
struct Connection {
  user: Option<String>,
  session: Option<PracticeSession>,
}

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "tinhnhanh_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "tinhnhanh_backend", "WebSocket connected");
  let mut conn = Connection::default();
  let mut audio_rx = state.audio.subscribe();

  loop {
    tokio::select! {
      incoming = socket.recv() => {
        let Some(Ok(msg)) = incoming else { break };
        match msg {
          Message::Text(txt) => {
            // Parse, dispatch, serialize response.
            let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(incoming) => {
                debug!(target: "tinhnhanh_backend", "WS received: {:?}", &incoming);
                handle_client_ws(incoming, &state, &mut conn).await
              }
              Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
            };
            if send_json(&mut socket, &reply_msg).await.is_err() {
              break;
            }
          }
          Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
          Message::Close(_) => break,
          _ => {}
        }
      }
      frame = audio_rx.recv() => {
        match frame {
          Ok(AudioFrame { audio_base64, sample_rate_hz }) => {
            let msg = ServerWsMessage::Audio { audio_base64, sample_rate_hz };
            if send_json(&mut socket, &msg).await.is_err() {
              break;
            }
          }
          Err(RecvError::Lagged(skipped)) => {
            warn!(target: "narration", skipped, "Client too slow; dropped narration clips");
          }
          Err(RecvError::Closed) => break,
        }
      }
    }
  }

  // A session left open when the socket drops is still recorded.
  if let Err(e) = save_open_session(&state, &mut conn).await {
    error!(target: "practice", error = %e, "Failed to save session on disconnect");
  }
  info!(target: "tinhnhanh_backend", "WebSocket disconnected");
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "tinhnhanh_backend", error = %e, "WS send error");
    e
  })
}

fn error_msg(message: impl Into<String>) -> ServerWsMessage {
  ServerWsMessage::Error { message: message.into() }
}

/// Save the running session, if any. It only leaves the connection once saved.
async fn save_open_session(state: &AppState, conn: &mut Connection) -> Result<Option<SavedSession>, StoreError> {
  let Some(session) = conn.session.as_ref() else {
    return Ok(None);
  };
  let saved = finish_session(state, session).await?;
  conn.session = None;
  Ok(Some(saved))
}

fn saved_to_msg(saved: SavedSession) -> ServerWsMessage {
  ServerWsMessage::SessionSaved {
    on_leaderboard: saved.score.is_some(),
    history: saved.history,
    leaderboard_error: saved.leaderboard_error,
  }
}

fn next_to_msg(next: Next, score: u32) -> ServerWsMessage {
  match next {
    Next::Problem { problem, number } => ServerWsMessage::Problem { problem: to_out(&problem), number, score },
    Next::QuizOver { score, total, .. } => ServerWsMessage::QuizOver { score, total },
  }
}

#[instrument(level = "info", skip(state, conn))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, conn: &mut Connection) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Login { user } => {
      let user = user.trim().to_string();
      if user.is_empty() {
        return error_msg("Name must not be empty.");
      }
      info!(target: "practice", %user, "User logged in");
      conn.user = Some(user.clone());
      ServerWsMessage::LoggedIn { user }
    }

    ClientWsMessage::StartSession { topic, difficulty, mode } => {
      let Some(user) = conn.user.clone() else {
        return error_msg("Log in first.");
      };
      if let Err(e) = save_open_session(state, conn).await {
        return error_msg(format!("Could not save the previous session: {}", e));
      }
      let session = PracticeSession::new(&user, topic, difficulty, mode, state.config.quiz.length);
      info!(
        target: "practice",
        %user,
        topic = topic.label(),
        difficulty = difficulty.label(),
        mode = mode.label(),
        session_id = %session.id,
        "Session started"
      );
      let reply = ServerWsMessage::SessionStarted {
        session_id: session.id.to_string(),
        topic,
        difficulty,
        mode,
        quiz_length: session.quiz_length(),
      };
      conn.session = Some(session);
      reply
    }

    ClientWsMessage::NextProblem => match conn.session.as_mut() {
      Some(session) => match advance_session(state, session) {
        Ok(next) => next_to_msg(next, session.score()),
        Err(e) => error_msg(e.to_string()),
      },
      None => error_msg("No session running."),
    },

    ClientWsMessage::SubmitAnswer { answer } => match conn.session.as_mut() {
      Some(session) => match answer_in_session(state, session, &answer) {
        Ok(fb) => ServerWsMessage::AnswerResult {
          correct: fb.correct,
          message: fb.message,
          correct_answer: fb.correct_answer_display,
          score: fb.score,
        },
        Err(e) => error_msg(e.to_string()),
      },
      None => error_msg("No session running."),
    },

    ClientWsMessage::Repeat => match conn.session.as_ref() {
      Some(session) => match repeat_problem(state, session) {
        Ok(problem) => ServerWsMessage::Problem {
          problem: to_out(problem),
          number: session.question_number(),
          score: session.score(),
        },
        Err(e) => error_msg(e.to_string()),
      },
      None => error_msg("No session running."),
    },

    ClientWsMessage::FinishSession => match save_open_session(state, conn).await {
      Ok(Some(saved)) => saved_to_msg(saved),
      Ok(None) => error_msg("No session running."),
      Err(e) => error_msg(format!("Could not save the session, try again: {}", e)),
    },
  }
}
