//! Grammar analysis: FIRST/FOLLOW sets, left-recursion removal, left
//! factorization, LL(1) tables, and LR(1)/LALR(1) automata with their
//! recognizers.

use grammar::{GrammarError, ProductionSet, Symbol, TransformLog};
use itertools::Itertools;
use thiserror::Error;

pub mod first;
pub mod follow;
pub mod graph;
pub mod left_recursion;
pub mod left_factor;
pub mod ll1;
pub mod lr1;
pub mod report;
mod augment;

pub use first::FirstTable;
pub use follow::FollowTable;
pub use graph::{DerivationGraph, RecursionKind};
pub use ll1::{Ll1Table, Ll1Recognizer};
pub use lr1::{Action, LrTable, LrRecognizer, LrKind};

pub(crate) use grammar::{Map, Set};

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Grammar(#[from] GrammarError),
  #[error(transparent)]
  Conflict(#[from] GrammarConflictError),
  #[error("left recursion could not be removed: {}", .cycle.join(" -> "))]
  LeftRecursion {
    cycle: Vec<String>,
  },
  #[error("non-terminal `{0}` derives no terminal string")]
  NonProductive(String),
  #[error("invalid parsing table: {0}")]
  InvalidTable(String),
}

/// Every conflict found while filling one table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{table} table has {} conflict(s)", .conflicts.len())]
pub struct GrammarConflictError {
  pub table: &'static str,
  pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
  Ll1(Ll1ConflictError),
  ShiftReduce(ShiftReduceConflictError),
  ReduceReduce(ReduceReduceConflictError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ll1ConflictError {
  pub nonterminal: String,
  pub lookahead: String,
  pub prod1: String,
  pub prod2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftReduceConflictError {
  pub state_items: Vec<String>,
  pub shift: String,
  pub reduce: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceReduceConflictError {
  pub state_items: Vec<String>,
  pub lookahead: String,
  pub reduce1: String,
  pub reduce2: String,
}

/// Outcome of feeding one lookahead to a recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// The terminal was consumed.
  Shifted,
  /// End of input was accepted.
  Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected {found}, expected one of: {}", display_expected(.expected))]
pub struct RecognizeError {
  pub found: Symbol,
  pub expected: Vec<Symbol>,
}

fn display_expected(expected: &[Symbol]) -> String {
  expected.iter().join(", ")
}

/// A table-driven recognizer fed one lookahead at a time. The input must
/// end with [`Symbol::EndOfInput`].
pub trait Recognizer {
  fn feed(&mut self, lookahead: &Symbol) -> Result<Step, RecognizeError>;
}

/// Runs the rewriting passes in order: duplicate removal, left-recursion
/// removal, then left factorization. The result is ready for
/// [`Ll1Table::build`].
pub fn normalize(set: &mut ProductionSet, log: &mut TransformLog) -> Result<(), Error> {
  set.assert_no_macros();

  let mark = log.len();
  set.remove_duplicates(log);
  left_recursion::remove_left_recursion(set, log)?;
  left_factor::left_factor(set, log);

  tracing::debug!(changes = log.len() - mark, productions = set.len(), "grammar normalized");
  Ok(())
}
