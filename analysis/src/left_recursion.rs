//! Left-recursion removal.
//!
//! Direct recursion `A -> A α | β` becomes `A -> β A'`, `A' -> α A' | ε`.
//! Indirect and hidden recursion is first turned into direct recursion by
//! substituting the leading non-terminal of a recursive production with its
//! bodies. Non-terminals are ranked by their order in the set; a cycle
//! member is only substituted into a higher-ranked one, so every cycle is
//! broken after finitely many rounds.

use grammar::{
  NonTerminal, Pass, ProductionRule, ProductionSet, Sentence, Symbol, TransformLog,
};
use tracing::debug;
use crate::first::FirstTable;
use crate::graph::{DerivationGraph, RecursionKind};
use crate::Error;

const MAX_ROUNDS: usize = 64;

pub fn remove_left_recursion(set: &mut ProductionSet, log: &mut TransformLog) -> Result<(), Error> {
  remove_within(set, log, MAX_ROUNDS)
}

fn remove_within(
  set: &mut ProductionSet,
  log: &mut TransformLog,
  max_rounds: usize,
) -> Result<(), Error> {
  set.assert_no_macros();

  for round in 0..=max_rounds {
    let first = FirstTable::compute(set);
    let graph = DerivationGraph::build(set, &first);
    let recursive = graph.left_recursive()
      .into_iter()
      .cloned()
      .collect::<Vec<_>>();

    if recursive.is_empty() {
      return Ok(());
    }

    debug!(round, nonterminals = recursive.len(), "removing left recursion");

    let mut progress = false;
    if round < max_rounds {
      for nt in &recursive {
        progress |= remove_direct(set, nt, log)?;
      }

      if !progress {
        progress = substitute_leading(set, &graph, &recursive, log);
      }
    }

    if !progress {
      let cycle = graph.left_cycle(&recursive[0])
        .unwrap_or_default()
        .into_iter()
        .map(|nt| nt.to_string())
        .collect();
      return Err(Error::LeftRecursion { cycle });
    }
  }

  unreachable!()
}

/// Rewrites `A -> A α | β` into `A -> β A'`, `A' -> α A' | ε`. Returns
/// `false` if no production of `nt` starts with `nt`, and fails if every
/// production does, since `A` then derives no terminal string.
fn remove_direct(
  set: &mut ProductionSet,
  nt: &NonTerminal,
  log: &mut TransformLog,
) -> Result<bool, Error> {
  let (recursive, others): (Vec<ProductionRule>, Vec<ProductionRule>) = set.productions_of(nt)
    .map(|(_, rule)| rule.clone())
    .partition(ProductionRule::is_directly_left_recursive);

  if recursive.is_empty() {
    return Ok(false);
  }
  if others.is_empty() {
    return Err(Error::NonProductive(nt.to_string()));
  }

  let fresh = set.fresh_nonterminal(nt);
  let tail = Sentence::new(vec![fresh.clone().into()]);

  for rule in recursive.iter().chain(&others) {
    set.remove(rule, Pass::LeftRecursion, log);
  }

  for rule in &others {
    set.add(
      ProductionRule::new(nt.clone(), rule.body.concat(&tail)),
      Pass::LeftRecursion,
      log);
  }

  for rule in &recursive {
    let alpha = rule.body.suffix(1);
    // `A -> A` derives nothing new
    if alpha.is_epsilon() {
      continue;
    }
    set.add(
      ProductionRule::new(fresh.clone(), alpha.concat(&tail)),
      Pass::LeftRecursion,
      log);
  }

  set.add(ProductionRule::new(fresh, Sentence::epsilon()), Pass::LeftRecursion, log);
  Ok(true)
}

/// Replaces `A -> B γ` by `A -> δ γ` for every `B -> δ`, for the first
/// non-terminal `A` (in set order) owning a left-recursive production that
/// starts with another non-terminal.
fn substitute_leading(
  set: &mut ProductionSet,
  graph: &DerivationGraph,
  recursive: &[NonTerminal],
  log: &mut TransformLog,
) -> bool {
  let rank = |nt: &NonTerminal| graph.node_index(nt).unwrap_or(usize::MAX);

  for nt in set.nonterminals() {
    if !recursive.contains(&nt) {
      continue;
    }

    let targets = set.productions_of(&nt)
      .filter(|(i, rule)| {
        let on_cycle = graph.edges_of(*i)
          .any(|e| matches!(e.kind, RecursionKind::Left | RecursionKind::IndirectLeft));
        let leader = match rule.body.first() {
          Symbol::NonTerminal(leader) if *leader != nt => leader,
          _ => return false,
        };
        // a leader on the same cycle is only expanded into a later
        // non-terminal; a nullable leader off the cycle can always go.
        on_cycle && (!graph.left_reaches(leader, &nt) || rank(leader) < rank(&nt))
      })
      .map(|(_, rule)| rule.clone())
      .collect::<Vec<_>>();

    if targets.is_empty() {
      continue;
    }

    for rule in targets {
      let leader = match rule.body.first() {
        Symbol::NonTerminal(leader) => leader.clone(),
        _ => unreachable!(),
      };
      let gamma = rule.body.suffix(1);

      set.remove(&rule, Pass::LeftRecursion, log);
      for delta in set.bodies_of(&leader) {
        set.add(
          ProductionRule::new(nt.clone(), delta.concat(&gamma)),
          Pass::LeftRecursion,
          log);
      }
    }

    return true;
  }

  false
}
