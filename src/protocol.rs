//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, HistoryEntry, PracticeMode, Problem, ScoreEntry, Topic};
use crate::store::{SortDirection, SortKey};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Login {
        user: String,
    },
    StartSession {
        topic: Topic,
        difficulty: Difficulty,
        mode: PracticeMode,
    },
    NextProblem,
    SubmitAnswer {
        answer: String,
    },
    /// Read the current problem aloud again.
    Repeat,
    FinishSession,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    LoggedIn {
        user: String,
    },
    SessionStarted {
        #[serde(rename = "sessionId")]
        session_id: String,
        topic: Topic,
        difficulty: Difficulty,
        mode: PracticeMode,
        #[serde(rename = "quizLength", skip_serializing_if = "Option::is_none")]
        quiz_length: Option<u32>,
    },
    Problem {
        problem: ProblemOut,
        number: u32,
        score: u32,
    },
    AnswerResult {
        correct: bool,
        message: String,
        #[serde(rename = "correctAnswer")]
        correct_answer: String,
        score: u32,
    },
    QuizOver {
        score: u32,
        total: u32,
    },
    SessionSaved {
        history: HistoryEntry,
        #[serde(rename = "onLeaderboard")]
        on_leaderboard: bool,
        /// Set when the history entry was saved but the leaderboard entry was not.
        #[serde(rename = "leaderboardError", skip_serializing_if = "Option::is_none")]
        leaderboard_error: Option<String>,
    },
    /// Synthesized narration, 16-bit mono PCM.
    Audio {
        #[serde(rename = "audioBase64")]
        audio_base64: String,
        #[serde(rename = "sampleRateHz")]
        sample_rate_hz: u32,
    },
    Error {
        message: String,
    },
}

/// Problem as shown during a session; the answer stays on the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemOut {
    pub question_text: String,
    pub speakable_text: String,
}

pub fn to_out(p: &Problem) -> ProblemOut {
    ProblemOut {
        question_text: p.question_text.clone(),
        speakable_text: p.speakable_text.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct ProblemQuery {
    pub topic: Topic,
    pub difficulty: Difficulty,
}

#[derive(Deserialize)]
pub struct CheckIn {
    pub answer: String,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: f64,
}
#[derive(Serialize)]
pub struct CheckOut {
    pub correct: bool,
}

#[derive(Deserialize)]
pub struct SpeakIn {
    pub text: String,
}
#[derive(Serialize)]
pub struct SpeakOut {
    pub queued: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user: String,
}
#[derive(Serialize)]
pub struct HistoryOut {
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
}
#[derive(Serialize)]
pub struct LeaderboardOut {
    pub entries: Vec<ScoreEntry>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
