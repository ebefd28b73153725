//! Small recursive-descent evaluator for the arithmetic the generators emit.
//!
//! Grammar:
//!   expr   := term (('+' | '-') term)*
//!   term   := unary (('*' | '/') unary)*
//!   unary  := '-' unary | atom
//!   atom   := number | '(' expr ')'
//!
//! Whitespace between tokens is ignored.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
  #[error("unexpected character '{found}' at offset {pos}")]
  Unexpected { found: char, pos: usize },
  #[error("unexpected end of expression")]
  UnexpectedEnd,
  #[error("invalid number '{0}'")]
  BadNumber(String),
  #[error("division by zero")]
  DivisionByZero,
}

/// Evaluate `text` with standard precedence.
pub fn evaluate(text: &str) -> Result<f64, ExprError> {
  let mut p = Parser { src: text.as_bytes(), pos: 0 };
  let value = p.expr()?;
  p.skip_ws();
  match p.peek() {
    None => Ok(value),
    Some(c) => Err(ExprError::Unexpected { found: c as char, pos: p.pos }),
  }
}

struct Parser<'a> {
  src: &'a [u8],
  pos: usize,
}

impl<'a> Parser<'a> {
  fn peek(&self) -> Option<u8> {
    self.src.get(self.pos).copied()
  }

  fn skip_ws(&mut self) {
    while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
      self.pos += 1;
    }
  }

  /// Consume `c` if it is the next non-space byte.
  fn eat(&mut self, c: u8) -> bool {
    self.skip_ws();
    if self.peek() == Some(c) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expr(&mut self) -> Result<f64, ExprError> {
    let mut acc = self.term()?;
    loop {
      if self.eat(b'+') {
        acc += self.term()?;
      } else if self.eat(b'-') {
        acc -= self.term()?;
      } else {
        return Ok(acc);
      }
    }
  }

  fn term(&mut self) -> Result<f64, ExprError> {
    let mut acc = self.unary()?;
    loop {
      if self.eat(b'*') {
        acc *= self.unary()?;
      } else if self.eat(b'/') {
        let rhs = self.unary()?;
        if rhs == 0.0 {
          return Err(ExprError::DivisionByZero);
        }
        acc /= rhs;
      } else {
        return Ok(acc);
      }
    }
  }

  fn unary(&mut self) -> Result<f64, ExprError> {
    if self.eat(b'-') {
      return Ok(-self.unary()?);
    }
    self.atom()
  }

  fn atom(&mut self) -> Result<f64, ExprError> {
    if self.eat(b'(') {
      let v = self.expr()?;
      if !self.eat(b')') {
        return match self.peek() {
          Some(c) => Err(ExprError::Unexpected { found: c as char, pos: self.pos }),
          None => Err(ExprError::UnexpectedEnd),
        };
      }
      return Ok(v);
    }
    self.number()
  }

  fn number(&mut self) -> Result<f64, ExprError> {
    self.skip_ws();
    let start = self.pos;
    while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'.') {
      self.pos += 1;
    }
    if start == self.pos {
      return match self.peek() {
        Some(c) => Err(ExprError::Unexpected { found: c as char, pos: self.pos }),
        None => Err(ExprError::UnexpectedEnd),
      };
    }
    // Only ASCII digits and dots were consumed, so this slice is valid UTF-8.
    let lit = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
    lit.parse::<f64>().map_err(|_| ExprError::BadNumber(lit))
  }
}
