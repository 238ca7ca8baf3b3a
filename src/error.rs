//! Shared error type for the compilation pipeline.
//!
//! Every variant remembers the byte offset it was raised at. The source text
//! itself is not stored; callers hand it back to [`CompileError::render`] to
//! get a chibicc-style diagnostic with a caret under the offending column.

use std::num::ParseIntError;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("invalid token"))]
  InvalidToken { loc: usize },

  #[snafu(display("invalid number: {source}"))]
  InvalidNumber { loc: usize, source: ParseIntError },

  #[snafu(display("expected \"{expected}\", but got \"{found}\""))]
  ExpectedToken {
    expected: &'static str,
    found: String,
    loc: usize,
  },

  #[snafu(display("expected an expression, but got \"{found}\""))]
  ExpectedExpression { found: String, loc: usize },

  #[snafu(display("extra token \"{found}\""))]
  ExtraToken { found: String, loc: usize },

  #[snafu(display("not an lvalue"))]
  NotAnLvalue { loc: usize },
}

impl CompileError {
  /// Byte offset into the source the error is anchored at.
  pub fn loc(&self) -> usize {
    match self {
      Self::InvalidToken { loc }
      | Self::InvalidNumber { loc, .. }
      | Self::ExpectedToken { loc, .. }
      | Self::ExpectedExpression { loc, .. }
      | Self::ExtraToken { loc, .. }
      | Self::NotAnLvalue { loc } => *loc,
    }
  }

  /// Format the error against `source`: the offending line, then a caret
  /// under the error column followed by the message.
  pub fn render(&self, source: &str) -> String {
    let mut loc = self.loc().min(source.len());
    while !source.is_char_boundary(loc) {
      loc -= 1;
    }
    let line_start = source[..loc].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[loc..].find('\n').map_or(source.len(), |i| loc + i);
    let column = source[line_start..loc].chars().count();
    format!(
      "{}\n{}^ {self}",
      &source[line_start..line_end],
      " ".repeat(column)
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn render_points_at_column() {
    let err = CompileError::InvalidToken { loc: 4 };
    assert_eq!(err.render("1 + $;"), "1 + $;\n    ^ invalid token");
  }

  #[test]
  fn render_uses_the_line_containing_the_error() {
    let source = "a = 1;\nb = ;\n";
    let err = CompileError::ExpectedExpression {
      found: ";".to_string(),
      loc: 11,
    };
    assert_eq!(
      err.render(source),
      "b = ;\n    ^ expected an expression, but got \";\""
    );
  }

  #[test]
  fn render_snaps_offsets_inside_a_character() {
    let err = CompileError::InvalidToken { loc: 1 };
    assert_eq!(err.render("é;"), "é;\n^ invalid token");
  }

  #[test]
  fn render_clamps_offsets_past_the_end() {
    let err = CompileError::NotAnLvalue { loc: 99 };
    assert_eq!(err.render("1"), "1\n ^ not an lvalue");
  }
}
