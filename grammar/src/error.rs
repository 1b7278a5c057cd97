use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrammarError {
  #[error("{kind} at {}..{}: {message}", .span.0, .span.1)]
  Syntax {
    kind: SyntaxErrorKind,
    message: String,
    span: (usize, usize),
  },
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("cannot read grammar file {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    source: io::Error,
  },
}

impl GrammarError {
  pub(crate) fn syntax(
    kind: SyntaxErrorKind,
    message: impl Into<String>,
    span: (usize, usize),
  ) -> Self {
    GrammarError::Syntax {
      kind,
      message: message.into(),
      span,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
  InvalidChar,
  UnclosedString,
  UnexpectedToken,
  NameConflict,
}

impl fmt::Display for SyntaxErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(match self {
      SyntaxErrorKind::InvalidChar => "invalid character",
      SyntaxErrorKind::UnclosedString => "unclosed string",
      SyntaxErrorKind::UnexpectedToken => "syntax error",
      SyntaxErrorKind::NameConflict => "name conflict",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("grammar has no productions")]
  Empty,
  #[error("start symbol `{0}` has no productions")]
  UndefinedStart(String),
  #[error("non-terminal `{name}` is used by `{rule}` but never defined")]
  UndefinedNonTerminal {
    name: String,
    rule: String,
  },
  #[error("non-terminal `{0}` is unreachable from the start symbol")]
  Unreachable(String),
}
