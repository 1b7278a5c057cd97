//! compute FIRST and NULLABLE sets.

use bitvec::prelude::*;
use grammar::{NonTerminal, ProductionSet, Symbol};
use crate::{Map, Set};

/// FIRST sets of every non-terminal. A set contains [`Symbol::Epsilon`]
/// exactly when the non-terminal is nullable.
#[derive(Debug, Clone)]
pub struct FirstTable {
  first: Map<NonTerminal, Set<Symbol>>,
}

impl FirstTable {
  pub fn compute(set: &ProductionSet) -> Self {
    set.assert_no_macros();

    let heads = index_by_head(set);
    let nullable = compute_nullable(set, &heads);
    let first = compute_first(set, &heads, &nullable);

    FirstTable { first }
  }

  /// Panics if `nt` is not a non-terminal of the analysed set.
  pub fn get(&self, nt: &NonTerminal) -> &Set<Symbol> {
    &self.first[nt]
  }

  pub fn is_nullable(&self, nt: &NonTerminal) -> bool {
    self.first.get(nt).map_or(false, |f| f.contains(&Symbol::Epsilon))
  }

  pub fn iter(&self) -> impl Iterator<Item = (&NonTerminal, &Set<Symbol>)> {
    self.first.iter()
  }

  /// FIRST of a symbol string. Contains [`Symbol::Epsilon`] when every
  /// symbol is nullable, including for an empty string.
  pub fn of_sentence<'a>(&self, symbols: impl IntoIterator<Item = &'a Symbol>) -> Set<Symbol> {
    let mut result = Set::default();

    for sym in symbols {
      match sym {
        Symbol::Terminal(_) | Symbol::EndOfInput => {
          result.insert(sym.clone());
          return result;
        }
        Symbol::NonTerminal(nt) => {
          result.extend(self.first[nt].iter().filter(|s| !s.is_epsilon()).cloned());
          if !self.is_nullable(nt) {
            return result;
          }
        }
        Symbol::Epsilon => {}
      }
    }

    result.insert(Symbol::Epsilon);
    result
  }
}

/// Production indices grouped by head.
pub(crate) fn index_by_head(set: &ProductionSet) -> Map<NonTerminal, Vec<usize>> {
  let mut heads = Map::<NonTerminal, Vec<usize>>::default();
  for nt in set.nonterminals() {
    heads.insert(nt, vec![]);
  }
  for (i, prod) in set.productions().iter().enumerate() {
    heads[&prod.head].push(i);
  }
  heads
}

fn compute_first(
  set: &ProductionSet,
  heads: &Map<NonTerminal, Vec<usize>>,
  nullable: &Set<NonTerminal>,
) -> Map<NonTerminal, Set<Symbol>> {
  let mut first = heads.keys()
    .map(|nt| (nt.clone(), Set::default()))
    .collect::<Map<_, _>>();

  // a cycle contributes nothing in the round it is detected; repeat until
  // no set grows.
  loop {
    let mut changed = false;
    let mut finished = Set::default();

    for nt in heads.keys() {
      changed |= compute_nonterminal_first(
        set, heads, nullable, &mut first, &mut Set::default(), &mut finished, nt);
    }

    if !changed {
      break;
    }
  }

  first
}

fn compute_nonterminal_first(
  set: &ProductionSet,
  heads: &Map<NonTerminal, Vec<usize>>,
  nullable: &Set<NonTerminal>,
  first: &mut Map<NonTerminal, Set<Symbol>>,
  visiting: &mut Set<NonTerminal>,
  finished: &mut Set<NonTerminal>,
  nt: &NonTerminal,
) -> bool {
  if finished.contains(nt) || !visiting.insert(nt.clone()) {
    return false;
  }

  let mut changed = false;
  let mut nt_first = first[nt].clone();

  for &i in &heads[nt] {
    for sym in &set.productions()[i].body {
      match sym {
        Symbol::Terminal(_) => {
          nt_first.insert(sym.clone());
          break;
        }
        Symbol::NonTerminal(nt_sym) => {
          changed |= compute_nonterminal_first(
            set, heads, nullable, first, visiting, finished, nt_sym);

          nt_first.extend(first[nt_sym].iter().filter(|s| !s.is_epsilon()).cloned());

          if !nullable.contains(nt_sym) {
            break;
          }
        }
        Symbol::Epsilon | Symbol::EndOfInput => {}
      }
    }
  }

  if nullable.contains(nt) {
    nt_first.insert(Symbol::Epsilon);
  }

  visiting.shift_remove(nt);
  finished.insert(nt.clone());

  if nt_first.len() != first[nt].len() {
    first[nt] = nt_first;
    changed = true;
  }

  changed
}

fn compute_nullable(
  set: &ProductionSet,
  heads: &Map<NonTerminal, Vec<usize>>,
) -> Set<NonTerminal> {
  let prods = set.productions();
  let mut prods_nullable = bitvec![0; prods.len()];

  loop {
    let mut changed = false;

    for (i, prod) in prods.iter().enumerate() {
      if prods_nullable[i] {
        continue;
      }

      let prod_nullable = prod.body.iter().all(|sym| match sym {
        Symbol::Epsilon => true,
        Symbol::NonTerminal(nt) => heads[nt].iter().any(|&j| prods_nullable[j]),
        Symbol::Terminal(_) | Symbol::EndOfInput => false,
      });

      if prod_nullable {
        prods_nullable.set(i, true);
        changed = true;
      }
    }

    if !changed {
      break;
    }
  }

  prods.iter()
    .enumerate()
    .filter(|(i, _)| prods_nullable[*i])
    .map(|(_, prod)| prod.head.clone())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn first_of(table: &FirstTable, nt: &str) -> Vec<String> {
    let mut syms = table.get(&NonTerminal::new(nt))
      .iter()
      .map(|s| s.to_string())
      .collect::<Vec<_>>();
    syms.sort();
    syms
  }

  #[test]
  fn nullable_chain() {
    let set = grammar::build(r#"
%token a
%token b
S = A B a
A = B | ()
B = b | ()
"#).unwrap();
    let table = FirstTable::compute(&set);

    assert!(table.is_nullable(&NonTerminal::new("A")));
    assert!(table.is_nullable(&NonTerminal::new("B")));
    assert!(!table.is_nullable(&NonTerminal::new("S")));
    assert_eq!(first_of(&table, "S"), vec!["a", "b"]);
    assert_eq!(first_of(&table, "A"), vec!["b", "ε"]);
  }

  #[test]
  fn left_recursive_cycle() {
    let set = grammar::build(r#"
%token plus
%token num
%token lp
%token rp
E = E plus T | T
T = F | lp E rp
F = num
"#).unwrap();
    let table = FirstTable::compute(&set);

    assert_eq!(first_of(&table, "E"), vec!["lp", "num"]);
    assert_eq!(first_of(&table, "T"), vec!["lp", "num"]);
  }

  #[test]
  fn mutual_recursion_through_nullable() {
    let set = grammar::build(r#"
%token x
%token y
S = A
A = B x | ()
B = A y
"#).unwrap();
    let table = FirstTable::compute(&set);

    assert_eq!(first_of(&table, "A"), vec!["y", "ε"]);
    assert_eq!(first_of(&table, "B"), vec!["y"]);
  }

  #[test]
  fn sentence_first() {
    let set = grammar::build(r#"
%token a
%token b
S = A b
A = a | ()
"#).unwrap();
    let table = FirstTable::compute(&set);
    let a = Symbol::nonterminal("A");

    let first = table.of_sentence(&[a.clone(), Symbol::EndOfInput]);
    assert_eq!(
      first.into_iter().collect::<Vec<_>>(),
      vec![Symbol::terminal("a"), Symbol::EndOfInput]);

    let first = table.of_sentence(&[a]);
    assert!(first.contains(&Symbol::Epsilon));
    assert!(table.of_sentence(&[]).contains(&Symbol::Epsilon));
  }
}
