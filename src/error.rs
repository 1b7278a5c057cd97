use thiserror::Error;
use crate::bind::BindingError;
use crate::config::ConfigError;
use crate::eval::ExecutionError;
use crate::lex::{LexError, Span};
use crate::parse::ParseError;
use crate::translate::TranslationError;
use crate::types::SchemaError;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Lex(#[from] LexError),
  #[error(transparent)]
  Parse(#[from] ParseError),
  #[error(transparent)]
  Binding(#[from] BindingError),
  #[error(transparent)]
  Translation(#[from] TranslationError),
  #[error(transparent)]
  Execution(#[from] ExecutionError),
  #[error(transparent)]
  Grammar(#[from] analysis::Error),
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Schema(#[from] SchemaError),
}

impl Error {
  /// Whether the query text is at fault, as opposed to the tables, the
  /// collaborators or the environment.
  pub fn is_invalid_query(&self) -> bool {
    matches!(self, Error::Lex(_) | Error::Parse(_) | Error::Binding(_))
  }

  /// Where in the query text the error was found.
  pub fn span(&self) -> Option<Span> {
    match self {
      Error::Lex(err) => Some(err.span),
      Error::Parse(err) => Some(err.span),
      Error::Binding(err) => Some(err.span),
      Error::Translation(err) => Some(err.span),
      _ => None,
    }
  }
}
