//! LL(1) parsing table and the predictive recognizer that walks it.

use std::fmt;
use grammar::{NonTerminal, ProductionRule, ProductionSet, Symbol};
use tracing::debug;
use crate::first::FirstTable;
use crate::follow::FollowTable;
use crate::{
  Conflict, Error, GrammarConflictError, Ll1ConflictError, Map, RecognizeError, Recognizer, Step,
};

#[derive(Debug, Clone)]
pub struct Ll1Table {
  start: NonTerminal,
  productions: Vec<ProductionRule>,
  /// (non-terminal, lookahead) -> production index
  table: Map<(NonTerminal, Symbol), usize>,
}

impl Ll1Table {
  pub fn build(set: &ProductionSet) -> Result<Self, Error> {
    let first = FirstTable::compute(set);
    let follow = FollowTable::compute(set, &first);
    Self::build_with(set, &first, &follow)
  }

  /// Places each production under FIRST of its body, and under FOLLOW of
  /// its head when the body is nullable. Every cell that receives two
  /// different productions is reported.
  pub fn build_with(
    set: &ProductionSet,
    first: &FirstTable,
    follow: &FollowTable,
  ) -> Result<Self, Error> {
    set.assert_no_macros();

    let mut table = Map::<(NonTerminal, Symbol), usize>::default();
    let mut conflicts = vec![];

    for (prod_ix, prod) in set.productions().iter().enumerate() {
      let body_first = first.of_sentence(&prod.body);
      let mut lookaheads = body_first.iter()
        .filter(|s| !s.is_epsilon())
        .cloned()
        .collect::<Vec<_>>();
      if body_first.contains(&Symbol::Epsilon) {
        lookaheads.extend(follow.get(&prod.head).iter().cloned());
      }

      for lookahead in lookaheads {
        let key = (prod.head.clone(), lookahead);
        match table.get(&key) {
          Some(&other) if other != prod_ix => {
            conflicts.push(Conflict::Ll1(Ll1ConflictError {
              nonterminal: prod.head.to_string(),
              lookahead: key.1.to_string(),
              prod1: set.productions()[other].to_string(),
              prod2: prod.to_string(),
            }));
          }
          Some(_) => {}
          None => {
            table.insert(key, prod_ix);
          }
        }
      }
    }

    if !conflicts.is_empty() {
      return Err(GrammarConflictError {
        table: "LL(1)",
        conflicts,
      }.into());
    }

    debug!(entries = table.len(), "LL(1) table built");

    Ok(Ll1Table {
      start: set.start().clone(),
      productions: set.productions().to_vec(),
      table,
    })
  }

  pub fn start(&self) -> &NonTerminal {
    &self.start
  }

  pub fn productions(&self) -> &[ProductionRule] {
    &self.productions
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }

  pub fn get(&self, nt: &NonTerminal, lookahead: &Symbol) -> Option<&ProductionRule> {
    self.table.get(&(nt.clone(), lookahead.clone()))
      .map(|&i| &self.productions[i])
  }

  /// Lookaheads with an entry in the row of `nt`.
  pub fn expected(&self, nt: &NonTerminal) -> Vec<Symbol> {
    self.table.keys()
      .filter(|(head, _)| head == nt)
      .map(|(_, sym)| sym.clone())
      .collect()
  }

  pub fn recognizer(&self) -> Ll1Recognizer<'_> {
    Ll1Recognizer::new(self)
  }
}

impl fmt::Display for Ll1Table {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for ((nt, sym), &prod) in &self.table {
      writeln!(f, "[{}, {}] {}", nt, sym, self.productions[prod])?;
    }
    Ok(())
  }
}

/// Predictive recognizer over an explicit symbol stack.
pub struct Ll1Recognizer<'t> {
  table: &'t Ll1Table,
  stack: Vec<Symbol>,
}

impl<'t> Ll1Recognizer<'t> {
  pub fn new(table: &'t Ll1Table) -> Self {
    Ll1Recognizer {
      table,
      stack: vec![Symbol::EndOfInput, Symbol::NonTerminal(table.start.clone())],
    }
  }
}

impl Recognizer for Ll1Recognizer<'_> {
  fn feed(&mut self, lookahead: &Symbol) -> Result<Step, RecognizeError> {
    loop {
      let top = match self.stack.pop() {
        Some(top) => top,
        None => {
          return Err(RecognizeError {
            found: lookahead.clone(),
            expected: vec![],
          });
        }
      };

      match &top {
        Symbol::NonTerminal(nt) => match self.table.get(nt, lookahead) {
          Some(prod) => {
            self.stack.extend(prod.body.iter().rev().filter(|s| !s.is_epsilon()).cloned());
          }
          None => {
            let expected = self.table.expected(nt);
            self.stack.push(top.clone());
            return Err(RecognizeError {
              found: lookahead.clone(),
              expected,
            });
          }
        },
        Symbol::Terminal(_) | Symbol::EndOfInput if top == *lookahead => {
          return Ok(if top == Symbol::EndOfInput {
            Step::Accepted
          } else {
            Step::Shifted
          });
        }
        Symbol::Terminal(_) | Symbol::EndOfInput => {
          self.stack.push(top.clone());
          return Err(RecognizeError {
            found: lookahead.clone(),
            expected: vec![top.clone()],
          });
        }
        Symbol::Epsilon => {}
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use grammar::TransformLog;
  use pretty_assertions::assert_eq;

  static EXPR: &str = r#"
%token plus
%token star
%token lp
%token rp
%token id
E = E plus T | T
T = T star F | F
F = lp E rp | id
"#;

  fn table(input: &str) -> Ll1Table {
    let mut log = TransformLog::new();
    let mut set = grammar::build_logged(input, &mut log).unwrap();
    crate::normalize(&mut set, &mut log).unwrap();
    Ll1Table::build(&set).unwrap()
  }

  fn recognize(table: &Ll1Table, input: &str) -> Result<Step, RecognizeError> {
    let mut recognizer = table.recognizer();
    for tag in input.split_whitespace() {
      recognizer.feed(&Symbol::terminal(tag))?;
    }
    recognizer.feed(&Symbol::EndOfInput)
  }

  #[test]
  fn expression_table() {
    let table = table(EXPR);

    let prod = table.get(&NonTerminal::new("E'"), &Symbol::terminal("rp")).unwrap();
    assert_eq!(prod.to_string(), "E' -> ε");
    let prod = table.get(&NonTerminal::new("F"), &Symbol::terminal("lp")).unwrap();
    assert_eq!(prod.to_string(), "F -> lp E rp");
    assert!(table.get(&NonTerminal::new("E"), &Symbol::terminal("plus")).is_none());
  }

  #[test]
  fn recognize_expressions() {
    let table = table(EXPR);

    assert_eq!(recognize(&table, "id"), Ok(Step::Accepted));
    assert_eq!(recognize(&table, "id plus id star lp id plus id rp"), Ok(Step::Accepted));

    let err = recognize(&table, "id plus star").unwrap_err();
    assert_eq!(err.found, Symbol::terminal("star"));
    let mut expected = err.expected.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    expected.sort();
    assert_eq!(expected, vec!["id", "lp"]);
  }

  #[test]
  fn premature_end() {
    let table = table(EXPR);
    let err = recognize(&table, "lp id").unwrap_err();

    assert_eq!(err.found, Symbol::EndOfInput);
    assert_eq!(err.to_string(), "unexpected $, expected one of: rp");
  }

  #[test]
  fn conflicts_are_collected() {
    let set = grammar::build(r#"
%token a
%token b
S = A a | a b
A = a | ()
"#).unwrap();
    let err = Ll1Table::build(&set).unwrap_err();

    match err {
      Error::Conflict(err) => {
        assert_eq!(err.table, "LL(1)");
        assert_eq!(err.conflicts, vec![Conflict::Ll1(Ll1ConflictError {
          nonterminal: "S".to_owned(),
          lookahead: "a".to_owned(),
          prod1: "S -> A a".to_owned(),
          prod2: "S -> a b".to_owned(),
        }), Conflict::Ll1(Ll1ConflictError {
          nonterminal: "A".to_owned(),
          lookahead: "a".to_owned(),
          prod1: "A -> a".to_owned(),
          prod2: "A -> ε".to_owned(),
        })]);
      }
      err => panic!("unexpected error: {}", err),
    }
  }
}
