use grammar::Symbol;
use crate::{RecognizeError, Recognizer, Step};
use super::tables::{Action, LrTable};

/// Shift-reduce recognizer over a stack of states.
pub struct LrRecognizer<'t> {
  table: &'t LrTable,
  stack: Vec<usize>,
}

impl<'t> LrRecognizer<'t> {
  pub fn new(table: &'t LrTable) -> Self {
    LrRecognizer {
      table,
      stack: vec![0],
    }
  }

  fn error(&self, state: usize, found: &Symbol) -> RecognizeError {
    RecognizeError {
      found: found.clone(),
      expected: self.table.expected(state),
    }
  }
}

impl Recognizer for LrRecognizer<'_> {
  fn feed(&mut self, lookahead: &Symbol) -> Result<Step, RecognizeError> {
    loop {
      let state = match self.stack.last() {
        Some(&state) => state,
        None => return Err(RecognizeError { found: lookahead.clone(), expected: vec![] }),
      };

      match self.table.action(state, lookahead) {
        Some(Action::Shift(next)) => {
          self.stack.push(next);
          return Ok(Step::Shifted);
        }
        Some(Action::Reduce(prod)) => {
          let rule = &self.table.productions()[prod];
          let len = self.stack.len().saturating_sub(rule.body.len());
          self.stack.truncate(len);

          let top = match self.stack.last() {
            Some(&top) => top,
            None => return Err(self.error(state, lookahead)),
          };
          match self.table.action(top, &Symbol::NonTerminal(rule.head.clone())) {
            Some(Action::Goto(next)) => self.stack.push(next),
            _ => return Err(self.error(top, lookahead)),
          }
        }
        Some(Action::Accept) => return Ok(Step::Accepted),
        Some(Action::Goto(_)) | None => return Err(self.error(state, lookahead)),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lr1::LrKind;
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

  fn recognize(table: &LrTable, input: &str) -> Result<Step, RecognizeError> {
    let mut recognizer = table.recognizer();
    for tag in input.split_whitespace() {
      assert_eq!(recognizer.feed(&Symbol::terminal(tag))?, Step::Shifted);
    }
    recognizer.feed(&Symbol::EndOfInput)
  }

  #[test]
  fn left_recursive_grammar() {
    let set = grammar::build(EXPR).unwrap();

    for kind in [LrKind::Canonical, LrKind::Lalr] {
      let table = LrTable::build(&set, kind).unwrap();
      assert_eq!(recognize(&table, "id plus id star id"), Ok(Step::Accepted));
      assert_eq!(recognize(&table, "lp lp id rp rp"), Ok(Step::Accepted));
    }
  }

  #[test]
  fn reports_expected_terminals() {
    let set = grammar::build(EXPR).unwrap();
    let table = LrTable::build(&set, LrKind::Lalr).unwrap();

    let err = recognize(&table, "id plus rp").unwrap_err();
    assert_eq!(err.found, Symbol::terminal("rp"));
    let mut expected = err.expected.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    expected.sort();
    assert_eq!(expected, vec!["id", "lp"]);
  }

  #[test]
  fn epsilon_productions() {
    let set = grammar::build(r#"
%token a
%token b
S = A b
A = a A | ()
"#).unwrap();
    let table = LrTable::build(&set, LrKind::Canonical).unwrap();

    assert_eq!(recognize(&table, "b"), Ok(Step::Accepted));
    assert_eq!(recognize(&table, "a a b"), Ok(Step::Accepted));
    assert!(recognize(&table, "a").is_err());
  }
}
