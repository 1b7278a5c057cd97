use std::fmt;
use std::ops::Index;
use super::symbol::{Symbol, NonTerminal};

/// Right-hand side of a production.
///
/// A sentence is never empty: the empty string is the single symbol
/// `Epsilon`, and epsilon never appears next to other symbols.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sentence(Vec<Symbol>);

impl Sentence {
  /// Builds a sentence, dropping epsilons that sit next to other symbols.
  ///
  /// # Panics
  ///
  /// Panics if `EndOfInput` appears in the body.
  pub fn new(symbols: Vec<Symbol>) -> Self {
    assert!(
      !symbols.contains(&Symbol::EndOfInput),
      "end-of-input cannot appear in a production body");

    let symbols = symbols.into_iter()
      .filter(|sym| !sym.is_epsilon())
      .collect::<Vec<_>>();

    if symbols.is_empty() {
      Self::epsilon()
    } else {
      Sentence(symbols)
    }
  }

  pub fn epsilon() -> Self {
    Sentence(vec![Symbol::Epsilon])
  }

  pub fn symbols(&self) -> &[Symbol] {
    &self.0
  }

  pub fn iter(&self) -> std::slice::Iter<Symbol> {
    self.0.iter()
  }

  /// Number of symbols; the epsilon sentence has length zero.
  pub fn len(&self) -> usize {
    if self.is_epsilon() {
      0
    } else {
      self.0.len()
    }
  }

  pub fn is_epsilon(&self) -> bool {
    self.0.len() == 1 && self.0[0].is_epsilon()
  }

  pub fn first(&self) -> &Symbol {
    &self.0[0]
  }

  /// The first `n` symbols. A zero-length prefix is epsilon.
  pub fn prefix(&self, n: usize) -> Sentence {
    Sentence::new(self.0[..n.min(self.len())].to_vec())
  }

  /// Symbols from position `from` on. Running off the end yields epsilon.
  pub fn suffix(&self, from: usize) -> Sentence {
    if from >= self.len() {
      Sentence::epsilon()
    } else {
      Sentence(self.0[from..].to_vec())
    }
  }

  pub fn leftmost_nonterminal(&self) -> Option<(usize, &NonTerminal)> {
    self.0.iter()
      .enumerate()
      .find_map(|(i, sym)| sym.as_nonterminal().map(|nt| (i, nt)))
  }

  pub fn concat(&self, other: &Sentence) -> Sentence {
    let mut symbols = self.0.clone();
    symbols.extend(other.0.iter().cloned());
    Sentence::new(symbols)
  }

  pub fn common_prefix_len(&self, other: &Sentence) -> usize {
    if self.is_epsilon() || other.is_epsilon() {
      return 0;
    }

    self.0.iter()
      .zip(&other.0)
      .take_while(|(a, b)| a == b)
      .count()
  }

  pub fn contains(&self, sym: &Symbol) -> bool {
    self.0.contains(sym)
  }
}

impl Index<usize> for Sentence {
  type Output = Symbol;

  fn index(&self, index: usize) -> &Symbol {
    &self.0[index]
  }
}

impl<'a> IntoIterator for &'a Sentence {
  type Item = &'a Symbol;
  type IntoIter = std::slice::Iter<'a, Symbol>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

impl From<Vec<Symbol>> for Sentence {
  fn from(symbols: Vec<Symbol>) -> Self {
    Sentence::new(symbols)
  }
}

impl fmt::Display for Sentence {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let mut space = false;
    for sym in &self.0 {
      if space {
        f.write_str(" ")?;
      }
      write!(f, "{}", sym)?;
      space = true;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn sentence(names: &[&str]) -> Sentence {
    Sentence::new(names.iter().map(|name| {
      if name.chars().next().unwrap().is_uppercase() {
        Symbol::nonterminal(*name)
      } else {
        Symbol::terminal(*name)
      }
    }).collect())
  }

  #[test]
  fn epsilon_is_never_mixed() {
    let s = Sentence::new(vec![Symbol::Epsilon, Symbol::terminal("a"), Symbol::Epsilon]);
    assert_eq!(s, sentence(&["a"]));
    assert_eq!(Sentence::new(vec![]), Sentence::epsilon());
    assert_eq!(Sentence::epsilon().len(), 0);
  }

  #[test]
  fn prefix_and_suffix() {
    let s = sentence(&["a", "B", "c"]);
    assert_eq!(s.prefix(2), sentence(&["a", "B"]));
    assert_eq!(s.prefix(0), Sentence::epsilon());
    assert_eq!(s.suffix(1), sentence(&["B", "c"]));
    assert_eq!(s.suffix(3), Sentence::epsilon());
  }

  #[test]
  fn leftmost_nonterminal() {
    let s = sentence(&["a", "B", "C"]);
    let (i, nt) = s.leftmost_nonterminal().unwrap();
    assert_eq!(i, 1);
    assert_eq!(nt.name(), "B");
    assert!(sentence(&["a"]).leftmost_nonterminal().is_none());
  }

  #[test]
  fn common_prefix() {
    assert_eq!(sentence(&["a", "B", "c"]).common_prefix_len(&sentence(&["a", "B", "d"])), 2);
    assert_eq!(sentence(&["a"]).common_prefix_len(&Sentence::epsilon()), 0);
  }

  #[test]
  #[should_panic(expected = "end-of-input")]
  fn end_of_input_rejected() {
    Sentence::new(vec![Symbol::terminal("a"), Symbol::EndOfInput]);
  }
}
