//! One practice or quiz run: problem sequencing, answer recording, scoring and
//! the records produced when the run ends.

use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::checker::check_answer;
use crate::expr::ExprError;
use crate::domain::{Attempt, Difficulty, HistoryEntry, PracticeMode, Problem, ScoreEntry, Topic, BLANK_ANSWER};
use crate::generator::{generate_with, speakable_answer};

pub const PRAISE: &str = "Đúng rồi, giỏi lắm!";

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
  #[error("no problem is being shown")]
  NoProblem,
  #[error("this problem was already answered")]
  AlreadyAnswered,
  #[error("the quiz is over")]
  QuizOver,
  #[error("answer the current problem first")]
  Unanswered,
  #[error("could not generate a problem: {0}")]
  Generate(#[from] ExprError),
}

/// Outcome of asking for the next problem.
#[derive(Debug, Clone, PartialEq)]
pub enum Next {
  Problem { problem: Problem, number: u32 },
  QuizOver { score: u32, total: u32, speech: String },
}

/// Result of checking one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
  pub correct: bool,
  pub message: String,
  pub speech: String,
  pub correct_answer_display: String,
  pub score: u32,
}

#[derive(Debug)]
pub struct PracticeSession {
  pub id: Uuid,
  pub user: String,
  pub topic: Topic,
  pub difficulty: Difficulty,
  pub mode: PracticeMode,
  quiz_length: u32,
  question_count: u32,
  score: u32,
  current: Option<Problem>,
  answered: bool,
  attempts: Vec<Attempt>,
}

impl PracticeSession {
  pub fn new(user: &str, topic: Topic, difficulty: Difficulty, mode: PracticeMode, quiz_length: u32) -> Self {
    Self {
      id: Uuid::new_v4(),
      user: user.to_string(),
      topic,
      difficulty,
      mode,
      quiz_length,
      question_count: 0,
      score: 0,
      current: None,
      answered: false,
      attempts: Vec::new(),
    }
  }

  pub fn score(&self) -> u32 {
    self.score
  }

  pub fn quiz_length(&self) -> Option<u32> {
    (self.mode == PracticeMode::Quiz).then_some(self.quiz_length)
  }

  /// 1-based number of the problem currently shown.
  pub fn question_number(&self) -> u32 {
    self.question_count
  }

  pub fn current(&self) -> Option<&Problem> {
    self.current.as_ref()
  }

  pub fn is_over(&self) -> bool {
    self.mode == PracticeMode::Quiz && self.question_count >= self.quiz_length
  }

  pub fn next_problem(&mut self) -> Result<Next, SessionError> {
    self.next_problem_with(&mut rand::thread_rng())
  }

  /// Move on to a new problem, or report the end of a quiz.
  /// A quiz only moves on once the current problem has been answered.
  pub fn next_problem_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Next, SessionError> {
    if self.mode == PracticeMode::Quiz && self.current.is_some() && !self.answered {
      return Err(SessionError::Unanswered);
    }
    if self.is_over() {
      self.current = None;
      return Ok(Next::QuizOver {
        score: self.score,
        total: self.quiz_length,
        speech: format!(
          "Bạn đã hoàn thành bài thi với {} trên {} điểm. Giỏi lắm!",
          self.score, self.quiz_length
        ),
      });
    }
    let problem = generate_with(rng, self.topic, self.difficulty)?;
    self.current = Some(problem.clone());
    self.answered = false;
    self.question_count += 1;
    Ok(Next::Problem { problem, number: self.question_count })
  }

  /// Check `input` against the current problem and record the attempt.
  pub fn submit(&mut self, input: &str) -> Result<Feedback, SessionError> {
    let problem = self.current.as_ref().ok_or(if self.is_over() {
      SessionError::QuizOver
    } else {
      SessionError::NoProblem
    })?;
    if self.answered {
      return Err(SessionError::AlreadyAnswered);
    }

    let correct = check_answer(input, problem.answer);
    let display = problem.correct_answer_display();
    self.attempts.push(Attempt {
      question_text: problem.question_text.clone(),
      user_answer: if input.is_empty() { BLANK_ANSWER.to_string() } else { input.to_string() },
      correct_answer_display: display.clone(),
      is_correct: correct,
    });
    self.answered = true;

    let (message, speech) = if correct {
      if self.mode == PracticeMode::Quiz {
        self.score += 1;
      }
      (PRAISE.to_string(), PRAISE.to_string())
    } else {
      (
        format!("Sai rồi. Đáp án đúng là {}", display),
        format!("Sai rồi, đáp án là {}", speakable_answer(problem)),
      )
    };

    Ok(Feedback { correct, message, speech, correct_answer_display: display, score: self.score })
  }

  /// Records for the run so far. Every run lands in history; only quizzes reach the leaderboard.
  pub fn finish(&self, timestamp: i64) -> (HistoryEntry, Option<ScoreEntry>) {
    let score_entry = (self.mode == PracticeMode::Quiz).then(|| ScoreEntry {
      user: self.user.clone(),
      score: self.score,
      topic: self.topic,
      difficulty: self.difficulty,
      timestamp,
    });
    let history = HistoryEntry {
      user: self.user.clone(),
      topic: self.topic,
      difficulty: self.difficulty,
      mode: self.mode,
      score: self.score,
      timestamp,
      attempts: self.attempts.clone(),
    };
    (history, score_entry)
  }
}
