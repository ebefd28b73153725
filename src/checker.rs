//! Free-text answer checking with numeric tolerance.
//!
//! Accepts plain numbers ("12", "-3.5", "2,5") and simple fractions ("3/4").
//! Anything unparseable is simply incorrect; this never errors.

/// Maximum absolute difference still counted as correct.
pub const TOLERANCE: f64 = 0.001;

pub fn check_answer(input: &str, correct: f64) -> bool {
  match parse_answer(input) {
    Some(value) => (value - correct).abs() < TOLERANCE,
    None => false,
  }
}

/// Parse user input into a number. A comma is read as the decimal point.
pub fn parse_answer(input: &str) -> Option<f64> {
  let cleaned = input.trim().replacen(',', ".", 1);

  if cleaned.contains('/') {
    let parts: Vec<&str> = cleaned.split('/').collect();
    if parts.len() != 2 {
      return None;
    }
    let n = parse_number(parts[0])?;
    let d = parse_number(parts[1])?;
    if d == 0.0 {
      return None;
    }
    return Some(n / d);
  }

  parse_number(&cleaned)
}

fn parse_number(s: &str) -> Option<f64> {
  s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
