//! Domain models: topics, difficulty tiers, problems, attempts and the two persisted record kinds.

use serde::{Deserialize, Serialize};

/// Placeholder recorded when the user submits an empty answer.
pub const BLANK_ANSWER: &str = "(bỏ trống)";

/// Category of math problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
  Integer,
  Fraction,
  Percentage,
  Expression,
}

impl Topic {
  pub const ALL: [Topic; 4] = [Topic::Integer, Topic::Fraction, Topic::Percentage, Topic::Expression];

  /// Label shown to the student.
  pub fn label(self) -> &'static str {
    match self {
      Topic::Integer => "Số nguyên",
      Topic::Fraction => "Phân số",
      Topic::Percentage => "Phần trăm",
      Topic::Expression => "Biểu thức",
    }
  }
}

/// Difficulty tier; controls numeric ranges and available operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

  pub fn label(self) -> &'static str {
    match self {
      Difficulty::Easy => "Dễ",
      Difficulty::Medium => "Trung bình",
      Difficulty::Hard => "Khó",
    }
  }
}

/// Free practice is unscored; quiz is a fixed-length scored run that feeds the leaderboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeMode {
  Practice,
  Quiz,
}

impl PracticeMode {
  pub fn label(self) -> &'static str {
    match self {
      PracticeMode::Practice => "Luyện tập",
      PracticeMode::Quiz => "Thi nhanh",
    }
  }
}

/// A generated problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
  pub question_text: String,
  pub speakable_text: String,
  pub answer: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub answer_display: Option<String>,
}

impl Problem {
  /// Exact display form if the generator provided one, otherwise the localized number.
  pub fn correct_answer_display(&self) -> String {
    match &self.answer_display {
      Some(d) => d.clone(),
      None => format_number_vi(self.answer),
    }
  }
}

/// One answered problem inside a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
  pub question_text: String,
  pub user_answer: String,
  pub correct_answer_display: String,
  pub is_correct: bool,
}

/// A finished session as stored in the user-wide history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
  pub user: String,
  pub topic: Topic,
  pub difficulty: Difficulty,
  pub mode: PracticeMode,
  pub score: u32,
  pub timestamp: i64,
  pub attempts: Vec<Attempt>,
}

/// A finished quiz as stored on the shared leaderboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
  pub user: String,
  pub score: u32,
  pub topic: Topic,
  pub difficulty: Difficulty,
  pub timestamp: i64,
}

/// Render a number the way a Vietnamese reader expects: decimal comma, at most
/// three fractional digits, no trailing zeros. No digit grouping, so the
/// result is always accepted back by the answer checker.
pub fn format_number_vi(value: f64) -> String {
  if value.fract() == 0.0 && value.abs() < 1e15 {
    return format!("{}", value as i64);
  }
  let s = format!("{:.3}", value);
  let s = s.trim_end_matches('0').trim_end_matches('.');
  if s == "-0" { "0".to_string() } else { s.replace('.', ",") }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_integers_and_decimals() {
    assert_eq!(format_number_vi(12.0), "12");
    assert_eq!(format_number_vi(-7.0), "-7");
    assert_eq!(format_number_vi(2.5), "2,5");
    assert_eq!(format_number_vi(0.125), "0,125");
    assert_eq!(format_number_vi(-0.0001), "0");
  }

  #[test]
  fn display_prefers_exact_form() {
    let p = Problem {
      question_text: "(1/4) + (2/4)".into(),
      speakable_text: "x".into(),
      answer: 0.75,
      answer_display: Some("3/4".into()),
    };
    assert_eq!(p.correct_answer_display(), "3/4");

    let q = Problem { answer_display: None, answer: 37.5, ..p };
    assert_eq!(q.correct_answer_display(), "37,5");
  }

  #[test]
  fn enums_use_snake_case_on_the_wire() {
    assert_eq!(serde_json::to_string(&Topic::Percentage).unwrap(), "\"percentage\"");
    let d: Difficulty = serde_json::from_str("\"hard\"").unwrap();
    assert_eq!(d, Difficulty::Hard);
  }
}
