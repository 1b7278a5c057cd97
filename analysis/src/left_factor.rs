use grammar::{Pass, ProductionRule, ProductionSet, Sentence, TransformLog};
use tracing::debug;

/// Pulls common prefixes out of alternatives: `A -> α β1 | α β2` becomes
/// `A -> α A'`, `A' -> β1 | β2`. Runs until no head has two alternatives
/// sharing a leading symbol, so a second run changes nothing. Returns the
/// number of factorings applied.
pub fn left_factor(set: &mut ProductionSet, log: &mut TransformLog) -> usize {
  set.assert_no_macros();

  let mut count = 0;
  loop {
    let mut progress = false;

    for head in set.nonterminals() {
      let members = match set.common_prefix_groups(&head).into_iter().next() {
        Some((_, members)) => members,
        None => continue,
      };

      let rules = members.iter()
        .map(|&i| set.productions()[i].clone())
        .collect::<Vec<_>>();
      let prefix_len = rules[1..].iter()
        .map(|r| rules[0].body.common_prefix_len(&r.body))
        .min()
        .unwrap_or(0);
      let alpha = rules[0].body.prefix(prefix_len);

      let fresh = set.fresh_nonterminal(&head);
      for rule in &rules {
        set.remove(rule, Pass::LeftFactorization, log);
      }

      set.add(
        ProductionRule::new(head.clone(), alpha.concat(&Sentence::new(vec![fresh.clone().into()]))),
        Pass::LeftFactorization,
        log);
      for rule in &rules {
        set.add(
          ProductionRule::new(fresh.clone(), rule.body.suffix(prefix_len)),
          Pass::LeftFactorization,
          log);
      }

      debug!(%head, prefix = %alpha, "left factored");
      count += 1;
      progress = true;
    }

    if !progress {
      break;
    }
  }

  count
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn factor(input: &str) -> ProductionSet {
    let mut set = grammar::build(input).unwrap();
    left_factor(&mut set, &mut TransformLog::new());
    set
  }

  #[test]
  fn common_prefix() {
    let set = factor(r#"
%token if_
%token then
%token else_
%token e
%token s
S = if_ e then S | if_ e then S else_ S | s
"#);

    assert_eq!(set.to_string(), "\
S -> s | if_ e then S S'
S' -> ε | else_ S
");
  }

  #[test]
  fn nested_prefixes() {
    let set = factor(r#"
%token a
%token b
%token c
%token d
S = a b c | a b d | a c
"#);

    assert_eq!(set.to_string(), "\
S -> a S'
S' -> c | b S''
S'' -> c | d
");
  }

  #[test]
  fn idempotent() {
    let input = r#"
%token a
%token b
%token c
S = a b | a c | b
"#;
    let mut set = grammar::build(input).unwrap();
    let mut log = TransformLog::new();

    assert_eq!(left_factor(&mut set, &mut log), 1);
    let once = set.to_string();
    let mark = log.len();

    assert_eq!(left_factor(&mut set, &mut log), 0);
    assert_eq!(set.to_string(), once);
    assert!(log.since(mark).is_empty());
  }
}
