use std::fmt;
use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use crate::token::Literal;

static NUMBER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$")
    .unwrap_or_else(|err| panic!("invalid number pattern: {}", err))
});

/// Byte range into the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
  pub start: usize,
  pub end: usize,
}

impl Span {
  pub fn new(start: usize, end: usize) -> Self {
    Span { start, end }
  }

  /// Smallest span covering both.
  pub fn to(self, other: Span) -> Span {
    Span::new(self.start.min(other.start), self.end.max(other.end))
  }

  pub fn range(self) -> Range<usize> {
    self.start..self.end
  }
}

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}..{}", self.start, self.end)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexemeKind {
  LBrace,
  RBrace,
  LBracket,
  RBracket,
  Colon,
  Comma,
  String,
  Number,
  True,
  False,
  Null,
}

impl LexemeKind {
  pub const ALL: [LexemeKind; 11] = [
    LexemeKind::LBrace,
    LexemeKind::RBrace,
    LexemeKind::LBracket,
    LexemeKind::RBracket,
    LexemeKind::Colon,
    LexemeKind::Comma,
    LexemeKind::String,
    LexemeKind::Number,
    LexemeKind::True,
    LexemeKind::False,
    LexemeKind::Null,
  ];

  /// Terminal name of this kind in the token grammar.
  pub fn tag(self) -> &'static str {
    match self {
      LexemeKind::LBrace => "lbrace",
      LexemeKind::RBrace => "rbrace",
      LexemeKind::LBracket => "lbracket",
      LexemeKind::RBracket => "rbracket",
      LexemeKind::Colon => "colon",
      LexemeKind::Comma => "comma",
      LexemeKind::String => "string",
      LexemeKind::Number => "number",
      LexemeKind::True => "true",
      LexemeKind::False => "false",
      LexemeKind::Null => "null",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
  pub kind: LexemeKind,
  /// Decoded value of strings, numbers and keywords.
  pub literal: Option<Literal>,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LexError {
  pub kind: LexErrorKind,
  pub span: Span,
}

impl LexError {
  pub fn new(kind: LexErrorKind, span: Span) -> Self {
    LexError { kind, span }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
  InvalidChar(char),
  UnknownWord(String),
  UnterminatedString,
  InvalidEscape(String),
  InvalidNumber(String),
  Unexpected {
    found: String,
    expected: Vec<String>,
  },
  /// The text ended inside an unfinished structure.
  UnexpectedEnd {
    last_valid: usize,
    expected: Vec<String>,
  },
  TooLong {
    len: usize,
    limit: usize,
  },
  TooDeep {
    limit: usize,
  },
}

impl fmt::Display for LexErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      LexErrorKind::InvalidChar(c) => write!(f, "invalid character `{}`", c.escape_default()),
      LexErrorKind::UnknownWord(word) => write!(f, "unknown word `{}`", word),
      LexErrorKind::UnterminatedString => write!(f, "unterminated string"),
      LexErrorKind::InvalidEscape(text) => write!(f, "invalid escape sequence `{}`", text),
      LexErrorKind::InvalidNumber(text) => write!(f, "invalid number `{}`", text),
      LexErrorKind::Unexpected { found, expected } => {
        write!(f, "unexpected {}, expected one of: {}", found, expected.iter().join(", "))
      }
      LexErrorKind::UnexpectedEnd { last_valid, expected } => {
        write!(f, "unexpected end of query after position {}, expected one of: {}",
          last_valid, expected.iter().join(", "))
      }
      LexErrorKind::TooLong { len, limit } => {
        write!(f, "query is {} bytes long, the limit is {}", len, limit)
      }
      LexErrorKind::TooDeep { limit } => write!(f, "query nests deeper than {} levels", limit),
    }
  }
}

/// Splits query text into lexemes. Strings are unescaped and numbers
/// parsed as they are read.
pub struct Lexer<'a> {
  input: &'a str,
  chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
  pub fn new(input: &'a str) -> Self {
    Self {
      input,
      chars: input.char_indices().peekable(),
    }
  }

  fn lexeme(kind: LexemeKind, literal: Option<Literal>, start: usize, end: usize) -> Lexeme {
    Lexeme {
      kind,
      literal,
      span: Span::new(start, end),
    }
  }

  fn offset(&mut self) -> usize {
    self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
  }

  fn string(&mut self, start: usize) -> Result<Lexeme, LexError> {
    let mut buf = String::new();

    loop {
      match self.chars.next() {
        Some((k, '"')) => {
          return Ok(Self::lexeme(LexemeKind::String, Some(Literal::String(buf)), start, k + 1));
        }
        Some((k, '\\')) => buf.push(self.escape(k)?),
        Some((k, '\n')) => {
          return Err(LexError::new(LexErrorKind::UnterminatedString, Span::new(start, k)));
        }
        Some((_, c)) => buf.push(c),
        None => {
          let end = self.input.len();
          return Err(LexError::new(LexErrorKind::UnterminatedString, Span::new(start, end)));
        }
      }
    }
  }

  fn escape(&mut self, start: usize) -> Result<char, LexError> {
    let c = match self.chars.next() {
      Some((_, c)) => c,
      None => {
        let end = self.input.len();
        return Err(LexError::new(LexErrorKind::UnterminatedString, Span::new(start, end)));
      }
    };

    Ok(match c {
      '"' => '"',
      '\\' => '\\',
      '/' => '/',
      'b' => '\u{8}',
      'f' => '\u{c}',
      'n' => '\n',
      'r' => '\r',
      't' => '\t',
      'u' => {
        let mut code = self.hex4(start)?;
        // a high surrogate must be followed by an escaped low one
        if (0xD800..=0xDBFF).contains(&code) {
          let rest = self.offset();
          let low = if self.input[rest..].starts_with("\\u") {
            self.chars.nth(1);
            self.hex4(start)?
          } else {
            0
          };
          if !(0xDC00..=0xDFFF).contains(&low) {
            let end = self.offset();
            return Err(self.invalid_escape(start, end));
          }
          code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
        }
        match char::from_u32(code) {
          Some(c) => c,
          None => {
            let end = self.offset();
            return Err(self.invalid_escape(start, end));
          }
        }
      }
      c => {
        let end = start + 1 + c.len_utf8();
        return Err(self.invalid_escape(start, end));
      }
    })
  }

  fn hex4(&mut self, start: usize) -> Result<u32, LexError> {
    let mut code = 0;
    for _ in 0..4 {
      match self.chars.peek().and_then(|&(_, d)| d.to_digit(16)) {
        Some(digit) => {
          code = code * 16 + digit;
          self.chars.next();
        }
        None => {
          let end = self.offset();
          return Err(self.invalid_escape(start, end));
        }
      }
    }
    Ok(code)
  }

  fn invalid_escape(&self, start: usize, end: usize) -> LexError {
    LexError::new(
      LexErrorKind::InvalidEscape(self.input[start..end].to_owned()),
      Span::new(start, end),
    )
  }

  fn number(&mut self, start: usize) -> Result<Lexeme, LexError> {
    while let Some(&(_, c)) = self.chars.peek() {
      if !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        break;
      }
      self.chars.next();
    }
    let end = self.offset();
    let text = &self.input[start..end];

    let invalid = || LexError::new(LexErrorKind::InvalidNumber(text.to_owned()), Span::new(start, end));
    if !NUMBER.is_match(text) {
      return Err(invalid());
    }

    let literal = if text.contains(['.', 'e', 'E']) {
      Literal::Float(text.parse().map_err(|_| invalid())?)
    } else {
      // integers out of range fall back to floats
      match text.parse::<i64>() {
        Ok(n) => Literal::Int(n),
        Err(_) => Literal::Float(text.parse().map_err(|_| invalid())?),
      }
    };

    Ok(Self::lexeme(LexemeKind::Number, Some(literal), start, end))
  }

  fn word(&mut self, start: usize) -> Result<Lexeme, LexError> {
    while let Some(&(_, c)) = self.chars.peek() {
      if !(c.is_alphanumeric() || c == '_') {
        break;
      }
      self.chars.next();
    }
    let end = self.offset();

    let (kind, literal) = match &self.input[start..end] {
      "true" => (LexemeKind::True, Literal::Bool(true)),
      "false" => (LexemeKind::False, Literal::Bool(false)),
      "null" => (LexemeKind::Null, Literal::Null),
      word => {
        return Err(LexError::new(LexErrorKind::UnknownWord(word.to_owned()), Span::new(start, end)));
      }
    };
    Ok(Self::lexeme(kind, Some(literal), start, end))
  }
}

impl<'a> Iterator for Lexer<'a> {
  type Item = Result<Lexeme, LexError>;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(&(_, c)) = self.chars.peek() {
      if !c.is_whitespace() {
        break;
      }
      self.chars.next();
    }

    let (j, c) = self.chars.next()?;

    let punct = |kind| Some(Ok(Self::lexeme(kind, None, j, j + 1)));
    match c {
      '{' => punct(LexemeKind::LBrace),
      '}' => punct(LexemeKind::RBrace),
      '[' => punct(LexemeKind::LBracket),
      ']' => punct(LexemeKind::RBracket),
      ':' => punct(LexemeKind::Colon),
      ',' => punct(LexemeKind::Comma),
      '"' => Some(self.string(j)),
      '-' | '0'..='9' => Some(self.number(j)),
      _ if c.is_alphabetic() => Some(self.word(j)),
      _ => Some(Err(LexError::new(LexErrorKind::InvalidChar(c), Span::new(j, j + c.len_utf8())))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn kinds(input: &str) -> Vec<LexemeKind> {
    Lexer::new(input).map(|l| l.unwrap().kind).collect()
  }

  fn literal(input: &str) -> Literal {
    Lexer::new(input).next().unwrap().unwrap().literal.unwrap()
  }

  #[test]
  fn punctuation_and_keywords() {
    use LexemeKind::*;

    assert_eq!(kinds(r#"{"a": [1, true, false, null]}"#), vec![
      LBrace, String, Colon, LBracket, Number, Comma, True, Comma, False, Comma, Null, RBracket,
      RBrace,
    ]);
  }

  #[test]
  fn spans() {
    let spans = Lexer::new("  {\"ab\" :12}")
      .map(|l| l.unwrap().span)
      .collect::<Vec<_>>();

    assert_eq!(spans, vec![
      Span::new(2, 3),
      Span::new(3, 7),
      Span::new(8, 9),
      Span::new(9, 11),
      Span::new(11, 12),
    ]);
  }

  #[test]
  fn numbers() {
    assert_eq!(literal("18"), Literal::Int(18));
    assert_eq!(literal("-3"), Literal::Int(-3));
    assert_eq!(literal("1.5"), Literal::Float(1.5));
    assert_eq!(literal("2e3"), Literal::Float(2000.0));
    assert_eq!(literal("99999999999999999999"), Literal::Float(1e20));

    let err = Lexer::new("01").next().unwrap().unwrap_err();
    assert_eq!(err.kind, LexErrorKind::InvalidNumber("01".to_owned()));
    let err = Lexer::new("1.").next().unwrap().unwrap_err();
    assert_eq!(err.span, Span::new(0, 2));
  }

  #[test]
  fn string_escapes() {
    assert_eq!(literal(r#""a\"b\\c\nA""#), Literal::String("a\"b\\c\nA".to_owned()));

    let err = Lexer::new(r#""a\qb""#).next().unwrap().unwrap_err();
    assert_eq!(err.kind, LexErrorKind::InvalidEscape("\\q".to_owned()));
    assert_eq!(err.span, Span::new(2, 4));

    assert_eq!(literal(r#""\u00e9\ud83d\ude00""#), Literal::String("\u{e9}\u{1f600}".to_owned()));

    let err = Lexer::new(r#""\ud83d!""#).next().unwrap().unwrap_err();
    assert_eq!(err.kind, LexErrorKind::InvalidEscape("\\ud83d".to_owned()));
    assert_eq!(err.span, Span::new(1, 7));

    let err = Lexer::new(r#""\ude00""#).next().unwrap().unwrap_err();
    assert_eq!(err.kind, LexErrorKind::InvalidEscape("\\ude00".to_owned()));
  }

  #[test]
  fn unterminated_string() {
    let err = Lexer::new(r#"["abc"#).nth(1).unwrap().unwrap_err();
    assert_eq!(err, LexError::new(LexErrorKind::UnterminatedString, Span::new(1, 5)));
  }

  #[test]
  fn invalid_input() {
    let err = Lexer::new("[@]").nth(1).unwrap().unwrap_err();
    assert_eq!(err.kind, LexErrorKind::InvalidChar('@'));
    assert_eq!(err.to_string(), "invalid character `@`");

    let err = Lexer::new("nil").next().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "unknown word `nil`");
  }
}
