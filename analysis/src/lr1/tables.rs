use std::fmt;
use grammar::{ProductionRule, ProductionSet, Symbol};
use tracing::debug;
use crate::{
  Conflict,
  Error,
  GrammarConflictError,
  Map,
  ReduceReduceConflictError,
  ShiftReduceConflictError,
};
use super::{Automaton, LrKind, LrRecognizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
  Shift(usize),
  Reduce(usize),
  Accept,
  Goto(usize),
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Action::Shift(s) => write!(f, "s{}", s),
      Action::Reduce(p) => write!(f, "r{}", p),
      Action::Accept => write!(f, "acc"),
      Action::Goto(s) => write!(f, "g{}", s),
    }
  }
}

/// Combined action/goto table keyed by (state, symbol). Terminals and end
/// of input map to shift, reduce and accept; non-terminals map to goto.
#[derive(Debug, Clone)]
pub struct LrTable {
  kind: LrKind,
  productions: Vec<ProductionRule>,
  state_count: usize,
  actions: Map<(usize, Symbol), Action>,
}

impl LrTable {
  pub fn build(set: &ProductionSet, kind: LrKind) -> Result<Self, Error> {
    let automaton = Automaton::build(set, kind)?;
    Self::from_automaton(&automaton)
  }

  pub fn from_automaton(automaton: &Automaton) -> Result<Self, Error> {
    let prods = automaton.productions();
    let mut actions = Map::<(usize, Symbol), Action>::default();
    let mut conflicts = vec![];

    for (state_ix, state) in automaton.states().iter().enumerate() {
      let state_items = || {
        state.items.iter()
          .map(|item| automaton.item_to_string(item))
          .collect::<Vec<_>>()
      };

      for (sym, &next) in &state.transitions {
        let action = match sym {
          Symbol::NonTerminal(_) => Action::Goto(next),
          _ => Action::Shift(next),
        };
        actions.insert((state_ix, sym.clone()), action);
      }

      for item in &state.items {
        if item.dot < prods[item.production].body.len() {
          continue;
        }

        for lookahead in &item.lookaheads {
          let key = (state_ix, lookahead.clone());
          let action = if item.production == 0 {
            Action::Accept
          } else {
            Action::Reduce(item.production)
          };

          match actions.get(&key) {
            None => {
              actions.insert(key, action);
            }
            Some(&existing) if existing == action => {}
            Some(Action::Shift(_)) => {
              conflicts.push(Conflict::ShiftReduce(ShiftReduceConflictError {
                state_items: state_items(),
                shift: lookahead.to_string(),
                reduce: prods[item.production].to_string(),
              }));
            }
            Some(&Action::Reduce(other)) => {
              conflicts.push(Conflict::ReduceReduce(ReduceReduceConflictError {
                state_items: state_items(),
                lookahead: lookahead.to_string(),
                reduce1: prods[other].to_string(),
                reduce2: prods[item.production].to_string(),
              }));
            }
            Some(_) => {
              return Err(Error::InvalidTable(format!(
                "state {} has an accept/goto clash on {}", state_ix, lookahead)));
            }
          }
        }
      }
    }

    if !conflicts.is_empty() {
      return Err(GrammarConflictError {
        table: match automaton.kind() {
          LrKind::Canonical => "LR(1)",
          LrKind::Lalr => "LALR(1)",
        },
        conflicts,
      }.into());
    }

    let table = LrTable {
      kind: automaton.kind(),
      productions: prods.to_vec(),
      state_count: automaton.states().len(),
      actions,
    };
    table.validate()?;

    debug!(kind = %table.kind, states = table.state_count, entries = table.actions.len(), "LR table built");
    Ok(table)
  }

  /// Checks that state ids are contiguous from 0, every shift and goto
  /// targets an existing state, every reduce names an existing production,
  /// and accept only happens on end of input.
  pub fn validate(&self) -> Result<(), Error> {
    for ((state, sym), action) in &self.actions {
      if *state >= self.state_count {
        return Err(Error::InvalidTable(format!("unknown state {}", state)));
      }

      match (*action, sym) {
        (Action::Shift(next), Symbol::Terminal(_) | Symbol::EndOfInput)
        | (Action::Goto(next), Symbol::NonTerminal(_)) => {
          if next >= self.state_count {
            return Err(Error::InvalidTable(format!(
              "state {} on {} targets unknown state {}", state, sym, next)));
          }
        }
        (Action::Reduce(prod), Symbol::Terminal(_) | Symbol::EndOfInput) => {
          if prod == 0 || prod >= self.productions.len() {
            return Err(Error::InvalidTable(format!(
              "state {} on {} reduces by unknown production {}", state, sym, prod)));
          }
        }
        (Action::Accept, Symbol::EndOfInput) => {}
        (action, sym) => {
          return Err(Error::InvalidTable(format!(
            "state {} has {} on {}", state, action, sym)));
        }
      }
    }

    Ok(())
  }

  pub fn kind(&self) -> LrKind {
    self.kind
  }

  pub fn productions(&self) -> &[ProductionRule] {
    &self.productions
  }

  pub fn state_count(&self) -> usize {
    self.state_count
  }

  pub fn action(&self, state: usize, sym: &Symbol) -> Option<Action> {
    self.actions.get(&(state, sym.clone())).copied()
  }

  /// Terminals (and end of input) with an action in `state`.
  pub fn expected(&self, state: usize) -> Vec<Symbol> {
    self.actions.keys()
      .filter(|(s, sym)| *s == state && !sym.is_nonterminal())
      .map(|(_, sym)| sym.clone())
      .collect()
  }

  pub fn recognizer(&self) -> LrRecognizer<'_> {
    LrRecognizer::new(self)
  }
}

impl fmt::Display for LrTable {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for state in 0..self.state_count {
      let row = self.actions.iter()
        .filter(|((s, _), _)| *s == state)
        .map(|((_, sym), action)| format!("{}:{}", sym, action))
        .collect::<Vec<_>>();
      writeln!(f, "{}: {}", state, row.join(" "))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn lr1_but_not_lalr() {
    let set = grammar::build(r#"
%token a
%token b
%token c
%token d
%token e
S = a A d | b B d | a B e | b A e
A = c
B = c
"#).unwrap();

    assert!(LrTable::build(&set, LrKind::Canonical).is_ok());

    match LrTable::build(&set, LrKind::Lalr).unwrap_err() {
      Error::Conflict(err) => {
        assert_eq!(err.table, "LALR(1)");
        assert!(err.conflicts.iter().all(|c| matches!(c, Conflict::ReduceReduce(_))));
        match &err.conflicts[0] {
          Conflict::ReduceReduce(rr) => {
            assert_eq!(rr.reduce1, "A -> c");
            assert_eq!(rr.reduce2, "B -> c");
          }
          _ => unreachable!(),
        }
      }
      err => panic!("unexpected error: {}", err),
    }
  }

  #[test]
  fn ambiguous_grammar_shift_reduce() {
    let set = grammar::build("%token plus\n%token id\nE = E plus E | id\n").unwrap();

    match LrTable::build(&set, LrKind::Canonical).unwrap_err() {
      Error::Conflict(err) => {
        assert_eq!(err.conflicts[0], Conflict::ShiftReduce(ShiftReduceConflictError {
          state_items: vec![
            "E -> E . plus E      plus/$".to_owned(),
            "E -> E plus E .      plus/$".to_owned(),
          ],
          shift: "plus".to_owned(),
          reduce: "E -> E plus E".to_owned(),
        }));
      }
      err => panic!("unexpected error: {}", err),
    }
  }

  #[test]
  fn accept_on_end_of_input() {
    let set = grammar::build("%token a\nS = S a | a\n").unwrap();
    let table = LrTable::build(&set, LrKind::Lalr).unwrap();

    let accept = (0..table.state_count())
      .filter(|&s| table.action(s, &Symbol::EndOfInput) == Some(Action::Accept))
      .count();
    assert_eq!(accept, 1);
  }

  #[test]
  fn validation_rejects_dangling_state() {
    let set = grammar::build("%token a\nS = a\n").unwrap();
    let mut table = LrTable::build(&set, LrKind::Canonical).unwrap();
    table.actions.insert((0, Symbol::terminal("b")), Action::Shift(99));

    let err = table.validate().unwrap_err();
    assert_eq!(err.to_string(), "invalid parsing table: state 0 on b targets unknown state 99");
  }
}
