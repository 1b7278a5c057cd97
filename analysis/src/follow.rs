use grammar::{NonTerminal, ProductionSet, Symbol};
use crate::first::FirstTable;
use crate::{Map, Set};

/// FOLLOW sets. The start symbol's set always holds [`Symbol::EndOfInput`].
#[derive(Debug, Clone)]
pub struct FollowTable {
  follow: Map<NonTerminal, Set<Symbol>>,
}

impl FollowTable {
  pub fn compute(set: &ProductionSet, first: &FirstTable) -> Self {
    set.assert_no_macros();

    let mut follow = set.nonterminals()
      .into_iter()
      .map(|nt| (nt, Set::default()))
      .collect::<Map<_, Set<Symbol>>>();
    follow[set.start()].insert(Symbol::EndOfInput);

    loop {
      let mut changed = false;

      for prod in set.productions() {
        // what may follow the symbol currently under the cursor, scanning
        // the body right to left.
        let mut trailer = follow[&prod.head].clone();

        for sym in prod.body.iter().rev() {
          match sym {
            Symbol::Terminal(_) => {
              trailer.clear();
              trailer.insert(sym.clone());
            }
            Symbol::NonTerminal(nt) => {
              let nt_follow = &mut follow[nt];
              let before = nt_follow.len();
              nt_follow.extend(trailer.iter().cloned());
              changed |= nt_follow.len() != before;

              let nt_first = first.get(nt).iter().filter(|s| !s.is_epsilon()).cloned();
              if first.is_nullable(nt) {
                trailer.extend(nt_first);
              } else {
                trailer = nt_first.collect();
              }
            }
            Symbol::Epsilon | Symbol::EndOfInput => {}
          }
        }
      }

      if !changed {
        break;
      }
    }

    FollowTable { follow }
  }

  /// Panics if `nt` is not a non-terminal of the analysed set.
  pub fn get(&self, nt: &NonTerminal) -> &Set<Symbol> {
    &self.follow[nt]
  }

  pub fn iter(&self) -> impl Iterator<Item = (&NonTerminal, &Set<Symbol>)> {
    self.follow.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn follow_of(table: &FollowTable, nt: &str) -> Vec<String> {
    let mut syms = table.get(&NonTerminal::new(nt))
      .iter()
      .map(|s| s.to_string())
      .collect::<Vec<_>>();
    syms.sort();
    syms
  }

  #[test]
  fn expression_grammar() {
    let set = grammar::build(r#"
%token plus
%token star
%token lp
%token rp
%token id
E = T E'
E' = plus T E' | ()
T = F T'
T' = star F T' | ()
F = lp E rp | id
"#).unwrap();
    let first = FirstTable::compute(&set);
    let follow = FollowTable::compute(&set, &first);

    assert_eq!(follow_of(&follow, "E"), vec!["$", "rp"]);
    assert_eq!(follow_of(&follow, "E'"), vec!["$", "rp"]);
    assert_eq!(follow_of(&follow, "T"), vec!["$", "plus", "rp"]);
    assert_eq!(follow_of(&follow, "T'"), vec!["$", "plus", "rp"]);
    assert_eq!(follow_of(&follow, "F"), vec!["$", "plus", "rp", "star"]);
  }

  #[test]
  fn start_symbol_follows_end_of_input() {
    let set = grammar::build("%token a\nS = a\n").unwrap();
    let first = FirstTable::compute(&set);
    let follow = FollowTable::compute(&set, &first);

    assert!(follow.get(set.start()).contains(&Symbol::EndOfInput));
  }
}
