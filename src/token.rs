//! The token tree: the JSON-like structure of a query with the span of
//! every node. The tree is assembled while a table-driven recognizer checks
//! the lexeme stream against the token grammar.

use std::fmt;
use grammar::Symbol;
use analysis::{Recognizer, RecognizeError, Step};
use crate::config::Config;
use crate::lex::{Lexeme, LexemeKind, LexError, LexErrorKind, Lexer, Span};
use crate::tables::{TableKind, Tables};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
}

impl fmt::Display for Literal {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Literal::Null => write!(f, "null"),
      Literal::Bool(b) => write!(f, "{}", b),
      Literal::Int(n) => write!(f, "{}", n),
      Literal::Float(x) => write!(f, "{:?}", x),
      Literal::String(s) => write!(f, "{}", quote(s)),
    }
  }
}

pub(crate) fn quote(s: &str) -> String {
  serde_json::Value::String(s.to_owned()).to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
  Value(ValueToken),
  Array(ArrayToken),
  Object(ObjectToken),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueToken {
  pub value: Literal,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayToken {
  pub elements: Vec<Token>,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectToken {
  pub properties: Vec<Property>,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
  pub key: String,
  pub key_span: Span,
  pub value: Token,
}

impl Token {
  pub fn span(&self) -> Span {
    match self {
      Token::Value(t) => t.span,
      Token::Array(t) => t.span,
      Token::Object(t) => t.span,
    }
  }

  pub fn describe(&self) -> &'static str {
    match self {
      Token::Value(ValueToken { value: Literal::String(_), .. }) => "string",
      Token::Value(_) => "value",
      Token::Array(_) => "array",
      Token::Object(_) => "object",
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Token::Value(ValueToken { value: Literal::String(s), .. }) => Some(s),
      _ => None,
    }
  }
}

/// Turns query text into a token tree, rejecting anything the selected
/// parsing table does not accept.
pub struct Tokenizer<'t> {
  tables: &'t Tables,
  kind: TableKind,
  max_len: usize,
  max_depth: usize,
}

impl<'t> Tokenizer<'t> {
  pub fn new(tables: &'t Tables, config: &Config) -> Self {
    Tokenizer {
      tables,
      kind: config.table,
      max_len: config.max_query_len,
      max_depth: config.max_depth,
    }
  }

  pub fn tokenize(&self, text: &str) -> Result<Token, LexError> {
    if text.len() > self.max_len {
      return Err(LexError::new(
        LexErrorKind::TooLong { len: text.len(), limit: self.max_len },
        Span::new(self.max_len, text.len()),
      ));
    }

    let mut recognizer = self.tables.recognizer(self.kind);
    let mut builder = TreeBuilder::new(self.max_depth);
    let mut last_valid = 0;

    for lexeme in Lexer::new(text) {
      let lexeme = lexeme?;
      recognizer.feed(&Symbol::terminal(lexeme.kind.tag()))
        .map_err(|err| LexError::new(
          LexErrorKind::Unexpected {
            found: lexeme.kind.tag().to_owned(),
            expected: expected(&err),
          },
          lexeme.span,
        ))?;
      last_valid = lexeme.span.end;
      builder.push(lexeme)?;
    }

    let expected = match recognizer.feed(&Symbol::EndOfInput) {
      Ok(Step::Accepted) => None,
      Ok(Step::Shifted) => Some(vec![]),
      Err(err) => Some(expected(&err)),
    };
    if let Some(expected) = expected {
      return Err(LexError::new(
        LexErrorKind::UnexpectedEnd { last_valid, expected },
        Span::new(last_valid, text.len()),
      ));
    }

    builder.finish(Span::new(last_valid, text.len()))
  }
}

fn expected(err: &RecognizeError) -> Vec<String> {
  err.expected.iter().map(|sym| sym.to_string()).collect()
}

enum Frame {
  Array {
    start: usize,
    elements: Vec<Token>,
  },
  Object {
    start: usize,
    properties: Vec<Property>,
    key: Option<(String, Span)>,
    expects_key: bool,
  },
}

/// Assembles the tree from lexemes the recognizer already accepted.
struct TreeBuilder {
  stack: Vec<Frame>,
  root: Option<Token>,
  max_depth: usize,
}

impl TreeBuilder {
  fn new(max_depth: usize) -> Self {
    TreeBuilder {
      stack: vec![],
      root: None,
      max_depth,
    }
  }

  fn push(&mut self, lexeme: Lexeme) -> Result<(), LexError> {
    let span = lexeme.span;

    match lexeme.kind {
      LexemeKind::LBrace | LexemeKind::LBracket => {
        if self.stack.len() >= self.max_depth {
          return Err(LexError::new(LexErrorKind::TooDeep { limit: self.max_depth }, span));
        }
        self.stack.push(if lexeme.kind == LexemeKind::LBrace {
          Frame::Object { start: span.start, properties: vec![], key: None, expects_key: true }
        } else {
          Frame::Array { start: span.start, elements: vec![] }
        });
      }
      LexemeKind::RBrace | LexemeKind::RBracket => {
        let token = match self.stack.pop() {
          Some(Frame::Array { start, elements }) => {
            Token::Array(ArrayToken { elements, span: Span::new(start, span.end) })
          }
          Some(Frame::Object { start, properties, key: None, .. }) => {
            Token::Object(ObjectToken { properties, span: Span::new(start, span.end) })
          }
          _ => return Err(misplaced(&lexeme)),
        };
        self.complete(token, &lexeme)?;
      }
      LexemeKind::Colon => {}
      LexemeKind::Comma => {
        if let Some(Frame::Object { expects_key, .. }) = self.stack.last_mut() {
          *expects_key = true;
        }
      }
      LexemeKind::String => {
        if let Some(Frame::Object { key, expects_key: expects_key @ true, .. }) = self.stack.last_mut() {
          let name = match &lexeme.literal {
            Some(Literal::String(s)) => s.clone(),
            _ => return Err(misplaced(&lexeme)),
          };
          *key = Some((name, span));
          *expects_key = false;
          return Ok(());
        }
        self.value(lexeme)?;
      }
      LexemeKind::Number | LexemeKind::True | LexemeKind::False | LexemeKind::Null => {
        self.value(lexeme)?;
      }
    }

    Ok(())
  }

  fn value(&mut self, lexeme: Lexeme) -> Result<(), LexError> {
    let value = match &lexeme.literal {
      Some(value) => value.clone(),
      None => return Err(misplaced(&lexeme)),
    };
    let token = Token::Value(ValueToken { value, span: lexeme.span });
    self.complete(token, &lexeme)
  }

  fn complete(&mut self, token: Token, lexeme: &Lexeme) -> Result<(), LexError> {
    match self.stack.last_mut() {
      None if self.root.is_none() => self.root = Some(token),
      Some(Frame::Array { elements, .. }) => elements.push(token),
      Some(Frame::Object { properties, key, .. }) => match key.take() {
        Some((key, key_span)) => properties.push(Property { key, key_span, value: token }),
        None => return Err(misplaced(lexeme)),
      },
      None => return Err(misplaced(lexeme)),
    }
    Ok(())
  }

  fn finish(self, span: Span) -> Result<Token, LexError> {
    match self.root {
      Some(root) if self.stack.is_empty() => Ok(root),
      _ => Err(LexError::new(
        LexErrorKind::UnexpectedEnd { last_valid: span.start, expected: vec![] },
        span,
      )),
    }
  }
}

fn misplaced(lexeme: &Lexeme) -> LexError {
  LexError::new(
    LexErrorKind::Unexpected { found: lexeme.kind.tag().to_owned(), expected: vec![] },
    lexeme.span,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn tokenize_with(kind: TableKind, text: &str) -> Result<Token, LexError> {
    let config = Config { table: kind, ..Config::default() };
    let tables = Tables::embedded();
    Tokenizer::new(&tables, &config).tokenize(text)
  }

  fn tokenize(text: &str) -> Result<Token, LexError> {
    tokenize_with(TableKind::Lalr, text)
  }

  fn string(s: &str, start: usize, end: usize) -> Token {
    Token::Value(ValueToken { value: Literal::String(s.to_owned()), span: Span::new(start, end) })
  }

  #[test]
  fn object_with_array() {
    let token = tokenize(r#"{"$add": [1, "$a"]}"#).unwrap();

    assert_eq!(token, Token::Object(ObjectToken {
      properties: vec![Property {
        key: "$add".to_owned(),
        key_span: Span::new(1, 7),
        value: Token::Array(ArrayToken {
          elements: vec![
            Token::Value(ValueToken { value: Literal::Int(1), span: Span::new(10, 11) }),
            string("$a", 13, 17),
          ],
          span: Span::new(9, 18),
        }),
      }],
      span: Span::new(0, 19),
    }));
  }

  #[test]
  fn string_values_after_keys() {
    let token = tokenize(r#"{"a": "b", "c": "d"}"#).unwrap();

    match token {
      Token::Object(object) => {
        let pairs = object.properties.iter()
          .map(|p| (p.key.as_str(), p.value.as_str().unwrap()))
          .collect::<Vec<_>>();
        assert_eq!(pairs, vec![("a", "b"), ("c", "d")]);
      }
      token => panic!("unexpected token {:?}", token),
    }
  }

  #[test]
  fn every_table_builds_the_same_tree() {
    let text = r#"[{"$filter": ["x", {"$greater": ["$age", 18]}]}, {}, [], null, 2.5]"#;
    let expected = tokenize_with(TableKind::Lalr, text).unwrap();

    assert_eq!(tokenize_with(TableKind::Lr1, text).unwrap(), expected);
    assert_eq!(tokenize_with(TableKind::Ll1, text).unwrap(), expected);
  }

  #[test]
  fn unterminated_structure() {
    for kind in [TableKind::Ll1, TableKind::Lr1, TableKind::Lalr] {
      let err = tokenize_with(kind, r#"{"$add": [1, 2]"#).unwrap_err();
      assert_eq!(err.span, Span::new(15, 15));
      match err.kind {
        LexErrorKind::UnexpectedEnd { last_valid, mut expected } => {
          assert_eq!(last_valid, 15);
          expected.sort();
          assert_eq!(expected, vec!["comma", "rbrace"], "{}", kind);
        }
        other => panic!("unexpected error {:?}", other),
      }
    }
  }

  #[test]
  fn unexpected_lexeme() {
    let err = tokenize(r#"[1, 2,]"#).unwrap_err();
    assert_eq!(err.span, Span::new(6, 7));
    assert!(matches!(err.kind, LexErrorKind::Unexpected { ref found, .. } if found == "rbracket"));

    let err = tokenize(r#"{"a" 1}"#).unwrap_err();
    assert!(err.to_string().starts_with("unexpected number, expected one of: colon"));
  }

  #[test]
  fn limits() {
    let config = Config { max_depth: 3, max_query_len: 16, ..Config::default() };
    let tables = Tables::embedded();
    let tokenizer = Tokenizer::new(&tables, &config);

    assert!(tokenizer.tokenize("[[[1]]]").is_ok());
    let err = tokenizer.tokenize("[[[[1]]]]").unwrap_err();
    assert_eq!(err.kind, LexErrorKind::TooDeep { limit: 3 });
    assert_eq!(err.span, Span::new(3, 4));

    let err = tokenizer.tokenize(r#""aaaaaaaaaaaaaaaaaaaa""#).unwrap_err();
    assert_eq!(err.kind, LexErrorKind::TooLong { len: 22, limit: 16 });
  }

  #[test]
  fn empty_query() {
    let err = tokenize("  ").unwrap_err();
    assert!(matches!(err.kind, LexErrorKind::UnexpectedEnd { last_valid: 0, .. }));
  }
}
