//! Problem generation per topic and difficulty tier.
//!
//! Generation is not reproducible on purpose: `generate` draws from the thread RNG.
//! `generate_with` takes any `Rng` so tests can drive it with a seeded generator.

use rand::Rng;
use tracing::instrument;

use crate::domain::{format_number_vi, Difficulty, Problem, Topic};
use crate::expr::{evaluate, ExprError};

const ASK_EQUALS: &str = "bằng mấy?";
const ASK_HOW_MUCH: &str = "là bao nhiêu?";
const NEGATIVE: &str = "âm ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
  Add,
  Sub,
  Mul,
  Div,
}

impl Op {
  pub fn symbol(self) -> char {
    match self {
      Op::Add => '+',
      Op::Sub => '-',
      Op::Mul => '*',
      Op::Div => '/',
    }
  }

  pub fn spoken(self) -> &'static str {
    match self {
      Op::Add => "cộng",
      Op::Sub => "trừ",
      Op::Mul => "nhân",
      Op::Div => "chia",
    }
  }
}

/// Generate a fresh problem for `topic` at `difficulty`.
pub fn generate(topic: Topic, difficulty: Difficulty) -> Result<Problem, ExprError> {
  generate_with(&mut rand::thread_rng(), topic, difficulty)
}

#[instrument(level = "debug", skip(rng))]
pub fn generate_with<R: Rng + ?Sized>(
  rng: &mut R,
  topic: Topic,
  difficulty: Difficulty,
) -> Result<Problem, ExprError> {
  Ok(match topic {
    Topic::Integer => integer_problem(rng, difficulty)?,
    Topic::Fraction => fraction_problem(rng, difficulty),
    Topic::Percentage => percentage_problem(rng, difficulty),
    Topic::Expression => expression_problem(rng, difficulty),
  })
}

/// Wrap negative literals in parentheses so `5 + (-3)` reads unambiguously.
fn operand(n: i64) -> String {
  if n < 0 { format!("({})", n) } else { n.to_string() }
}

/// Spoken rendering of a symbolic expression. Binary minus is always written
/// with surrounding spaces by the generators, so any other '-' is a sign.
pub fn speakable_expression(text: &str) -> String {
  text
    .replace('+', Op::Add.spoken())
    .replace(" - ", &format!(" {} ", Op::Sub.spoken()))
    .replace('*', Op::Mul.spoken())
    .replace('/', Op::Div.spoken())
    .replace('-', NEGATIVE)
}

/// Spoken form of the correct answer, used when reading out a wrong-answer correction.
pub fn speakable_answer(problem: &Problem) -> String {
  match &problem.answer_display {
    Some(d) => d.replacen('/', " phần ", 1).replacen('-', NEGATIVE, 1),
    None => format_number_vi(problem.answer).replacen('-', NEGATIVE, 1),
  }
}

/// The operator is drawn at run time, so the answer comes from evaluating the text.
fn integer_problem<R: Rng + ?Sized>(rng: &mut R, difficulty: Difficulty) -> Result<Problem, ExprError> {
  let (mut a, mut b, op) = match difficulty {
    Difficulty::Easy => (rng.gen_range(-10..=10), rng.gen_range(1..=10), *pick(rng, &[Op::Add, Op::Sub])),
    Difficulty::Medium => (
      rng.gen_range(-25..=25),
      rng.gen_range(-25..=25),
      *pick(rng, &[Op::Add, Op::Sub, Op::Mul]),
    ),
    Difficulty::Hard => (
      rng.gen_range(-50..=50),
      rng.gen_range(-50..=50),
      *pick(rng, &[Op::Add, Op::Sub, Op::Mul, Op::Div]),
    ),
  };

  if op == Op::Div {
    b = rng.gen_range(-10..=10);
    if b == 0 {
      b = 1;
    }
    a *= b;
  }

  let question_text = format!("{} {} {}", operand(a), op.symbol(), operand(b));
  let answer = evaluate(&question_text)?;
  let speakable_text = format!("{} {}", speakable_expression(&question_text), ASK_EQUALS);

  Ok(Problem { question_text, speakable_text, answer, answer_display: None })
}

fn fraction_problem<R: Rng + ?Sized>(rng: &mut R, difficulty: Difficulty) -> Problem {
  match difficulty {
    Difficulty::Easy => {
      let d = rng.gen_range(3..=10);
      let n1 = rng.gen_range(1..d);
      let n2 = rng.gen_range(1..d);
      let op = *pick(rng, &[Op::Add, Op::Sub]);
      fraction_from(n1, d, n2, d, op)
    }
    Difficulty::Medium => {
      let d1 = rng.gen_range(3..=10);
      let d2 = rng.gen_range(3..=10);
      let n1 = rng.gen_range(1..=d1 * 2);
      let n2 = rng.gen_range(1..=d2 * 2);
      let op = *pick(rng, &[Op::Add, Op::Sub, Op::Mul]);
      fraction_from(n1, d1, n2, d2, op)
    }
    Difficulty::Hard => {
      let d1 = rng.gen_range(3..=15);
      let d2 = rng.gen_range(3..=15);
      let n1 = nonzero(rng.gen_range(-d1 * 2..=d1 * 2));
      let n2 = nonzero(rng.gen_range(-d2 * 2..=d2 * 2));
      let op = *pick(rng, &[Op::Add, Op::Sub, Op::Mul, Op::Div]);
      fraction_from(n1, d1, n2, d2, op)
    }
  }
}

fn nonzero(n: i64) -> i64 {
  if n == 0 { 1 } else { n }
}

/// Build a fraction problem from fixed draws. Denominators must be non-zero,
/// and so must `n2` when `op` is division.
pub fn fraction_from(n1: i64, d1: i64, n2: i64, d2: i64, op: Op) -> Problem {
  let question_text = format!("({}/{}) {} ({}/{})", n1, d1, op.symbol(), n2, d2);
  let speakable_text = format!(
    "mở ngoặc {} phần {} đóng ngoặc {} mở ngoặc {} phần {} đóng ngoặc {}",
    speakable_int(n1),
    d1,
    op.spoken(),
    speakable_int(n2),
    d2,
    ASK_EQUALS
  );

  let (mut num, mut den) = match op {
    Op::Add => (n1 * d2 + n2 * d1, d1 * d2),
    Op::Sub => (n1 * d2 - n2 * d1, d1 * d2),
    Op::Mul => (n1 * n2, d1 * d2),
    Op::Div => (n1 * d2, d1 * n2),
  };
  if den < 0 {
    num = -num;
    den = -den;
  }

  let answer = num as f64 / den as f64;
  Problem { question_text, speakable_text, answer, answer_display: Some(reduced_display(num, den)) }
}

fn speakable_int(n: i64) -> String {
  n.to_string().replacen('-', NEGATIVE, 1)
}

/// Lowest-terms rendering of `num/den` with `den > 0`.
fn reduced_display(num: i64, den: i64) -> String {
  if num == 0 {
    return "0".to_string();
  }
  let g = gcd(num, den);
  let (n, d) = (num / g, den / g);
  if d == 1 { n.to_string() } else { format!("{}/{}", n, d) }
}

pub fn gcd(a: i64, b: i64) -> i64 {
  let (mut a, mut b) = (a.abs(), b.abs());
  while b != 0 {
    let t = a % b;
    a = b;
    b = t;
  }
  a
}

fn percentage_problem<R: Rng + ?Sized>(rng: &mut R, difficulty: Difficulty) -> Problem {
  let (p, n): (i64, i64) = match difficulty {
    Difficulty::Easy => (*pick(rng, &[10, 20, 25, 50, 75]), rng.gen_range(2..=20) * 10),
    Difficulty::Medium => (rng.gen_range(5..=95), rng.gen_range(10..=500)),
    Difficulty::Hard => (rng.gen_range(1..=150), rng.gen_range(100..=10000)),
  };
  Problem {
    question_text: format!("{}% của {}", p, n),
    speakable_text: format!("{} phần trăm của {} {}", p, n, ASK_HOW_MUCH),
    answer: (p as f64 / 100.0) * n as f64,
    answer_display: None,
  }
}

/// One fixed template per tier, evaluated directly.
fn expression_problem<R: Rng + ?Sized>(rng: &mut R, difficulty: Difficulty) -> Problem {
  let a: i64 = rng.gen_range(-10..=10);
  let b: i64 = rng.gen_range(-10..=10);
  let c: i64 = rng.gen_range(-5..=5);
  let d: i64 = rng.gen_range(-5..=5);

  let (question_text, answer) = match difficulty {
    Difficulty::Easy => (format!("{} + ({} * {})", operand(a), operand(b), operand(c)), a + b * c),
    Difficulty::Medium => (
      format!("({} + {}) * ({} - {})", operand(a), operand(b), operand(c), operand(d)),
      (a + b) * (c - d),
    ),
    Difficulty::Hard => {
      let e: i64 = rng.gen_range(1..=5);
      (
        format!("({} * ({} - {})) + ({} * {})", operand(a), operand(b), operand(c), operand(d), e),
        a * (b - c) + d * e,
      )
    }
  };

  let speakable_text = format!("{} {}", speakable_expression(&question_text), ASK_EQUALS);
  Problem { question_text, speakable_text, answer: answer as f64, answer_display: None }
}

/// `items` is always a non-empty literal slice.
fn pick<'a, R: Rng + ?Sized, T>(rng: &mut R, items: &'a [T]) -> &'a T {
  &items[rng.gen_range(0..items.len())]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::checker::{check_answer, TOLERANCE};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  const ROUNDS: usize = 500;

  /// Recompute an answer from the question text alone.
  fn reevaluate(topic: Topic, text: &str) -> f64 {
    match topic {
      Topic::Percentage => {
        let (p, n) = text.split_once("% của ").expect("percentage shape");
        p.parse::<f64>().unwrap() / 100.0 * n.parse::<f64>().unwrap()
      }
      _ => evaluate(text).expect("question text evaluates"),
    }
  }

  #[test]
  fn every_topic_and_tier_is_well_formed() {
    let mut rng = StdRng::seed_from_u64(7);
    for topic in Topic::ALL {
      for difficulty in Difficulty::ALL {
        for _ in 0..ROUNDS {
          let p = generate_with(&mut rng, topic, difficulty).unwrap();
          assert!(!p.question_text.is_empty());
          assert!(!p.speakable_text.is_empty());
          assert!(p.answer.is_finite(), "{:?}", p);
          let again = reevaluate(topic, &p.question_text);
          assert!((again - p.answer).abs() < 1e-9, "{:?} re-evaluated to {}", p, again);
          let typed = p.answer_display.clone().unwrap_or_else(|| format_number_vi(p.answer));
          assert!(check_answer(&typed, p.answer), "{:?} rejects its own answer '{}'", p, typed);
        }
      }
    }
  }

  #[test]
  fn fraction_display_is_lowest_terms() {
    let mut rng = StdRng::seed_from_u64(11);
    for difficulty in Difficulty::ALL {
      for _ in 0..ROUNDS {
        let p = generate_with(&mut rng, Topic::Fraction, difficulty).unwrap();
        let display = p.answer_display.clone().expect("fractions always carry a display");
        let (n, d) = match display.split_once('/') {
          Some((n, d)) => (n.parse::<i64>().unwrap(), d.parse::<i64>().unwrap()),
          None => (display.parse::<i64>().unwrap(), 1),
        };
        assert!(d > 0, "{}", display);
        assert_eq!(gcd(n, d), if n == 0 { d } else { 1 }, "{} not reduced", display);
        assert!(((n as f64 / d as f64) - p.answer).abs() < TOLERANCE);
      }
    }
  }

  #[test]
  fn hard_integer_division_is_exact() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut seen_division = false;
    for _ in 0..ROUNDS * 4 {
      let p = generate_with(&mut rng, Topic::Integer, Difficulty::Hard).unwrap();
      if p.question_text.contains(" / ") {
        seen_division = true;
        assert_eq!(p.answer.fract(), 0.0, "{}", p.question_text);
      }
    }
    assert!(seen_division);
  }

  #[test]
  fn easy_integer_uses_positive_second_operand() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..ROUNDS {
      let p = generate_with(&mut rng, Topic::Integer, Difficulty::Easy).unwrap();
      assert!(!p.question_text.contains('*') && !p.question_text.contains('/'));
      assert!(!p.question_text.ends_with(')'), "{}", p.question_text);
    }
  }

  #[test]
  fn forced_fraction_example() {
    let p = fraction_from(1, 4, 2, 4, Op::Add);
    assert_eq!(p.question_text, "(1/4) + (2/4)");
    assert!((p.answer - 0.75).abs() < TOLERANCE);
    assert_eq!(p.answer_display.as_deref(), Some("3/4"));
    assert_eq!(
      p.speakable_text,
      "mở ngoặc 1 phần 4 đóng ngoặc cộng mở ngoặc 2 phần 4 đóng ngoặc bằng mấy?"
    );
  }

  #[test]
  fn fraction_sign_and_whole_results() {
    let p = fraction_from(1, 3, -2, 3, Op::Div);
    assert_eq!(p.answer_display.as_deref(), Some("-1/2"));
    let p = fraction_from(3, 4, 1, 4, Op::Sub);
    assert_eq!(p.answer_display.as_deref(), Some("1/2"));
    let p = fraction_from(2, 4, 2, 4, Op::Sub);
    assert_eq!(p.answer_display.as_deref(), Some("0"));
    let p = fraction_from(3, 3, 6, 3, Op::Add);
    assert_eq!(p.answer_display.as_deref(), Some("3"));
  }

  #[test]
  fn speakable_rendering() {
    assert_eq!(speakable_expression("(-3) - 5"), "(âm 3) trừ 5");
    assert_eq!(speakable_expression("4 * (-2)"), "4 nhân (âm 2)");
    let p = Problem {
      question_text: String::new(),
      speakable_text: String::new(),
      answer: -0.5,
      answer_display: Some("-1/2".into()),
    };
    assert_eq!(speakable_answer(&p), "âm 1 phần 2");
    let q = Problem { answer_display: None, answer: -12.0, ..p };
    assert_eq!(speakable_answer(&q), "âm 12");
  }
}
