//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about semantics beyond recognising
//! identifiers, punctuators and numeric literals. Multi-character punctuators
//! are matched before single-character ones to avoid ambiguity.

use snafu::ResultExt;
use tracing::debug;

use crate::error::{CompileResult, InvalidNumberSnafu, InvalidTokenSnafu};

/// Punctuators longer than one byte, tried before falling back to a single
/// punctuation character.
const MULTI_CHAR_PUNCTUATORS: [&str; 4] = ["==", "!=", "<=", ">="];

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Ident,
  Punctuator,
  Num,
  Eof,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

/// C's `isspace`: ASCII whitespace plus vertical tab.
fn is_space(c: u8) -> bool {
  c.is_ascii_whitespace() || c == b'\x0B'
}

fn is_ident_start(c: u8) -> bool {
  c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
  is_ident_start(c) || c.is_ascii_digit()
}

/// Length of the punctuator starting at `rest`, or 0 if there is none.
fn read_punct(rest: &str) -> usize {
  if MULTI_CHAR_PUNCTUATORS.iter().any(|op| rest.starts_with(op)) {
    return 2;
  }
  match rest.as_bytes().first() {
    Some(c) if c.is_ascii_punctuation() => 1,
    _ => 0,
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if is_space(c) {
      i += 1;
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let value = input[start..i]
        .parse::<i64>()
        .context(InvalidNumberSnafu { loc: start })?;
      tokens.push(Token::new(TokenKind::Num, start, i - start, Some(value)));
      continue;
    }

    if is_ident_start(c) {
      let start = i;
      while i < bytes.len() && is_ident_continue(bytes[i]) {
        i += 1;
      }
      tokens.push(Token::new(TokenKind::Ident, start, i - start, None));
      continue;
    }

    let len = read_punct(&input[i..]);
    if len > 0 {
      tokens.push(Token::new(TokenKind::Punctuator, i, len, None));
      i += len;
      continue;
    }

    return InvalidTokenSnafu { loc: i }.fail();
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  debug!(tokens = tokens.len(), "tokenized input");
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}
