use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use analysis::{Error, Ll1Table, LrKind, LrTable, Recognizer};
use grammar::{ProductionSet, TransformLog};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::lex::LexemeKind;

/// Token grammar the tokenizer checks query text against.
pub static WEBQL_GRAMMAR: &str = include_str!("webql.grammar");

static EMBEDDED: Lazy<Arc<Tables>> = Lazy::new(|| {
  let tables = Tables::from_grammar(WEBQL_GRAMMAR)
    .unwrap_or_else(|err| panic!("embedded token grammar is invalid: {}", err));
  Arc::new(tables)
});

/// Which parsing table drives tokenization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
  Ll1,
  Lr1,
  #[default]
  Lalr,
}

impl fmt::Display for TableKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(match self {
      TableKind::Ll1 => "ll1",
      TableKind::Lr1 => "lr1",
      TableKind::Lalr => "lalr",
    })
  }
}

impl FromStr for TableKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "ll1" => Ok(TableKind::Ll1),
      "lr1" => Ok(TableKind::Lr1),
      "lalr" => Ok(TableKind::Lalr),
      _ => Err(format!("unknown table type `{}`, expected ll1, lr1 or lalr", s)),
    }
  }
}

/// LL(1), LR(1) and LALR(1) tables of one token grammar. Immutable once
/// built and shared between compilations.
#[derive(Debug)]
pub struct Tables {
  ll1: Ll1Table,
  lr1: LrTable,
  lalr: LrTable,
}

impl Tables {
  /// Tables of the built-in token grammar, built on first use.
  pub fn embedded() -> Arc<Tables> {
    Arc::clone(&EMBEDDED)
  }

  pub fn from_grammar(text: &str) -> Result<Tables, Error> {
    Self::from_set(grammar::build(text)?)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Tables, Error> {
    Self::from_set(ProductionSet::load(path)?)
  }

  fn from_set(set: ProductionSet) -> Result<Tables, Error> {
    for terminal in set.terminals() {
      let known = LexemeKind::ALL.iter().any(|kind| kind.tag() == terminal.tag());
      if !known || terminal.value().is_some() {
        return Err(Error::InvalidTable(format!(
          "terminal {} is not a lexeme kind", terminal)));
      }
    }

    let lr1 = LrTable::build(&set, LrKind::Canonical)?;
    let lalr = LrTable::build(&set, LrKind::Lalr)?;

    let mut normalized = set;
    let mut log = TransformLog::new();
    analysis::normalize(&mut normalized, &mut log)?;
    let ll1 = Ll1Table::build(&normalized)?;

    debug!(
      lr1_states = lr1.state_count(),
      lalr_states = lalr.state_count(),
      ll1_entries = ll1.len(),
      rewrites = log.len(),
      "token tables built"
    );

    Ok(Tables { ll1, lr1, lalr })
  }

  pub fn ll1(&self) -> &Ll1Table {
    &self.ll1
  }

  pub fn lr1(&self) -> &LrTable {
    &self.lr1
  }

  pub fn lalr(&self) -> &LrTable {
    &self.lalr
  }

  pub fn recognizer(&self, kind: TableKind) -> Box<dyn Recognizer + '_> {
    match kind {
      TableKind::Ll1 => Box::new(self.ll1.recognizer()),
      TableKind::Lr1 => Box::new(self.lr1.recognizer()),
      TableKind::Lalr => Box::new(self.lalr.recognizer()),
    }
  }
}
