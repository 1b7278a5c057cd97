use std::collections::{BTreeSet, VecDeque};
use std::hash::Hash;
use grammar::{NonTerminal, ProductionRule, Symbol};
use crate::first::FirstTable;
use crate::Map;
use super::{Lr1Item, Lr1State};

pub(super) type StateStore<K> = Map<K, Lr1State>;

pub(super) trait LrComputation {
  type StateKey: Hash + Eq;

  /// `kernel` is sorted by (production, dot).
  ///
  /// Returns the state index and whether the state is new or has changed.
  fn store_state(
    states: &mut StateStore<Self::StateKey>,
    kernel: Vec<Lr1Item>,
  ) -> (usize, bool);
}

pub(super) enum CanonicalComputation {}

impl LrComputation for CanonicalComputation {
  type StateKey = Vec<Lr1Item>;

  fn store_state(
    states: &mut StateStore<Self::StateKey>,
    kernel: Vec<Lr1Item>,
  ) -> (usize, bool) {
    if let Some(i) = states.get_index_of(&kernel) {
      (i, false)
    } else {
      let (i, _) = states.insert_full(kernel.clone(), Lr1State::new(kernel));
      (i, true)
    }
  }
}

pub(super) enum LalrComputation {}

impl LrComputation for LalrComputation {
  type StateKey = Vec<(usize, usize)>;

  fn store_state(
    states: &mut StateStore<Self::StateKey>,
    kernel: Vec<Lr1Item>,
  ) -> (usize, bool) {
    let core = kernel.iter()
      .map(|item| (item.production, item.dot))
      .collect::<Vec<_>>();

    if let Some(i) = states.get_index_of(&core) {
      let mut changed = false;
      for (item, new_item) in states[i].items.iter_mut().zip(kernel) {
        let before = item.lookaheads.len();
        item.lookaheads.extend(new_item.lookaheads);
        changed |= item.lookaheads.len() != before;
      }
      (i, changed)
    } else {
      let (i, _) = states.insert_full(core, Lr1State::new(kernel));
      (i, true)
    }
  }
}

pub(super) fn gen_states<T: LrComputation>(
  prods: &[ProductionRule],
  heads: &Map<NonTerminal, Vec<usize>>,
  first: &FirstTable,
) -> Vec<Lr1State> {
  let mut states = StateStore::<T::StateKey>::default();
  let start_kernel = vec![
    Lr1Item {
      production: 0,
      dot: 0,
      lookaheads: BTreeSet::from([Symbol::EndOfInput]),
    }
  ];

  let (start_state, _) = T::store_state(&mut states, start_kernel);

  let mut queue = VecDeque::new();
  queue.push_back(start_state);

  while let Some(state_ix) = queue.pop_front() {
    compute_closure(prods, heads, first, &mut states[state_ix]);

    let transitions = compute_transitions(prods, &states[state_ix]);
    for (sym, mut kernel) in transitions {
      kernel.sort_by_key(|item| (item.production, item.dot));

      let (next_state, changed) = T::store_state(&mut states, kernel);
      if changed && !queue.contains(&next_state) {
        queue.push_back(next_state);
      }
      states[state_ix].transitions.insert(sym, next_state);
    }
  }

  states.into_values().collect()
}

fn compute_closure(
  prods: &[ProductionRule],
  heads: &Map<NonTerminal, Vec<usize>>,
  first: &FirstTable,
  state: &mut Lr1State,
) {
  // merged LALR kernels are closed again from scratch
  state.items.truncate(state.kernel_len);
  let items = &mut state.items;

  // (production, dot) -> item index
  let mut index = items.iter()
    .enumerate()
    .map(|(i, item)| ((item.production, item.dot), i))
    .collect::<Map<_, _>>();
  let mut queue = (0..items.len()).collect::<VecDeque<_>>();

  while let Some(i) = queue.pop_front() {
    let body = &prods[items[i].production].body;
    let dot = items[i].dot;
    if dot >= body.len() {
      continue;
    }

    let nt = match &body[dot] {
      Symbol::NonTerminal(nt) => nt,
      _ => continue,
    };

    let rest_first = first.of_sentence(&body.symbols()[dot + 1..]);
    let mut lookaheads = rest_first.iter()
      .filter(|s| !s.is_epsilon())
      .cloned()
      .collect::<BTreeSet<_>>();
    if rest_first.contains(&Symbol::Epsilon) {
      lookaheads.extend(items[i].lookaheads.iter().cloned());
    }

    for &prod in &heads[nt] {
      match index.get(&(prod, 0)) {
        Some(&j) => {
          let before = items[j].lookaheads.len();
          items[j].lookaheads.extend(lookaheads.iter().cloned());
          if items[j].lookaheads.len() != before && !queue.contains(&j) {
            queue.push_back(j);
          }
        }
        None => {
          index.insert((prod, 0), items.len());
          items.push(Lr1Item {
            production: prod,
            dot: 0,
            lookaheads: lookaheads.clone(),
          });
          queue.push_back(items.len() - 1);
        }
      }
    }
  }
}

fn compute_transitions(
  prods: &[ProductionRule],
  state: &Lr1State,
) -> Map<Symbol, Vec<Lr1Item>> {
  let mut transitions = Map::<_, Vec<Lr1Item>>::default();

  for item in &state.items {
    let body = &prods[item.production].body;
    if item.dot >= body.len() {
      continue;
    }

    transitions.entry(body[item.dot].clone())
      .or_default()
      .push(Lr1Item {
        production: item.production,
        dot: item.dot + 1,
        lookaheads: item.lookaheads.clone(),
      });
  }

  transitions
}
