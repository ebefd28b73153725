//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Serving stand-alone problems and checking answers
//!   - Advancing a practice session and narrating what the student sees
//!   - Finishing a session and persisting its history / leaderboard records
//!
//! Narration is fire-and-forget here: handles are dropped, the queued task still runs.

use tracing::{debug, error, info, instrument, warn};

use crate::checker::check_answer;
use crate::domain::{Difficulty, HistoryEntry, Problem, ScoreEntry, Topic};
use crate::expr::ExprError;
use crate::generator::generate;
use crate::session::{Feedback, Next, PracticeSession, SessionError};
use crate::state::AppState;
use crate::store::StoreError;
use crate::util::now_millis;

#[instrument(level = "info", skip(_state))]
pub fn serve_problem(_state: &AppState, topic: Topic, difficulty: Difficulty) -> Result<Problem, ExprError> {
  let p = generate(topic, difficulty).map_err(|e| {
    error!(target: "practice", error = %e, "Problem generation failed");
    e
  })?;
  debug!(target: "practice", question = %p.question_text, "Problem generated");
  Ok(p)
}

#[instrument(level = "info", skip(answer), fields(answer_len = answer.len()))]
pub fn check_only(answer: &str, correct_answer: f64) -> bool {
  check_answer(answer, correct_answer)
}

/// Queue `text` for narration without waiting for it.
pub fn narrate(state: &AppState, text: &str) {
  let _ = state.narration.speak(text);
}

#[instrument(level = "info", skip(state, session), fields(session_id = %session.id))]
pub fn advance_session(state: &AppState, session: &mut PracticeSession) -> Result<Next, SessionError> {
  let next = session.next_problem()?;
  match &next {
    Next::Problem { problem, number } => {
      info!(target: "practice", number, question = %problem.question_text, "Problem served");
      narrate(state, &problem.speakable_text);
    }
    Next::QuizOver { score, total, speech } => {
      info!(target: "practice", score, total, "Quiz finished");
      narrate(state, speech);
    }
  }
  Ok(next)
}

#[instrument(level = "info", skip(state, session, answer), fields(session_id = %session.id, answer_len = answer.len()))]
pub fn answer_in_session(
  state: &AppState,
  session: &mut PracticeSession,
  answer: &str,
) -> Result<Feedback, SessionError> {
  let fb = session.submit(answer)?;
  info!(target: "practice", correct = fb.correct, score = fb.score, "Answer checked");
  narrate(state, &fb.speech);
  Ok(fb)
}

/// Re-read the current problem, if any.
pub fn repeat_problem<'a>(state: &AppState, session: &'a PracticeSession) -> Result<&'a Problem, SessionError> {
  let p = session.current().ok_or(SessionError::NoProblem)?;
  narrate(state, &p.speakable_text);
  Ok(p)
}

/// What was persisted for a finished session.
#[derive(Debug)]
pub struct SavedSession {
  pub history: HistoryEntry,
  /// Present when the run is on the leaderboard.
  pub score: Option<ScoreEntry>,
  /// Set when history was saved but the leaderboard entry was not.
  pub leaderboard_error: Option<String>,
}

/// Persist a finished session. History is always written; quizzes also reach the leaderboard.
/// On `Err` nothing was saved and the session can be saved again.
#[instrument(level = "info", skip(state, session), fields(session_id = %session.id, user = %session.user))]
pub async fn finish_session(state: &AppState, session: &PracticeSession) -> Result<SavedSession, StoreError> {
  let (history, score) = session.finish(now_millis());
  match state.store.record_finished(history.clone(), score.clone()).await {
    Ok(()) => {
      info!(target: "practice", score = history.score, attempts = history.attempts.len(), on_leaderboard = score.is_some(), "Session saved");
      Ok(SavedSession { history, score, leaderboard_error: None })
    }
    Err(StoreError::HistoryOnly(e)) => {
      warn!(target: "practice", error = %e, "Session saved to history only");
      Ok(SavedSession { history, score: None, leaderboard_error: Some(e.to_string()) })
    }
    Err(e) => {
      error!(target: "practice", error = %e, "Failed to persist session");
      Err(e)
    }
  }
}
