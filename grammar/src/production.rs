use std::fmt;
use super::symbol::{NonTerminal, Symbol};
use super::sentence::Sentence;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionRule {
  pub head: NonTerminal,
  pub body: Sentence,
}

impl ProductionRule {
  pub fn new(head: NonTerminal, body: Sentence) -> Self {
    Self { head, body }
  }

  pub fn is_epsilon(&self) -> bool {
    self.body.is_epsilon()
  }

  /// `A -> A α` where the head is the first symbol of its own body.
  pub fn is_directly_left_recursive(&self) -> bool {
    matches!(self.body.first(), Symbol::NonTerminal(nt) if *nt == self.head)
  }
}

impl fmt::Display for ProductionRule {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{} -> {}", self.head, self.body)
  }
}
