//! The derivation graph: one node per non-terminal, one edge per
//! non-terminal occurrence in a production body. Nodes live in an arena and
//! are addressed by index.

use std::collections::VecDeque;
use bitvec::prelude::*;
use grammar::{NonTerminal, ProductionSet, Symbol};
use crate::first::FirstTable;
use crate::Map;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecursionKind {
  /// The target never derives the source again.
  None,
  /// Recursive, but a terminal is always consumed before the source
  /// reappears.
  Normal,
  /// `A -> α A β` with `α` nullable.
  Left,
  /// The source reappears at the left edge through other non-terminals.
  IndirectLeft,
}

#[derive(Debug, Clone)]
pub struct Edge {
  pub from: usize,
  pub to: usize,
  /// Index into the production set.
  pub production: usize,
  /// Position of the occurrence within the body.
  pub position: usize,
  /// Every symbol before the occurrence is nullable.
  pub leading: bool,
  pub kind: RecursionKind,
}

#[derive(Debug, Clone)]
pub struct DerivationGraph {
  nodes: Vec<NonTerminal>,
  index: Map<NonTerminal, usize>,
  edges: Vec<Edge>,
  /// `reach[i][j]`: `j` reachable from `i` through any edges.
  reach: Vec<BitVec>,
  /// Same, restricted to leading edges.
  left_reach: Vec<BitVec>,
}

impl DerivationGraph {
  pub fn build(set: &ProductionSet, first: &FirstTable) -> Self {
    set.assert_no_macros();

    let nodes = set.nonterminals();
    let index = nodes.iter()
      .enumerate()
      .map(|(i, nt)| (nt.clone(), i))
      .collect::<Map<_, _>>();

    let mut edges = vec![];
    for (prod_ix, prod) in set.productions().iter().enumerate() {
      let mut leading = true;
      for (position, sym) in prod.body.iter().enumerate() {
        match sym {
          Symbol::NonTerminal(nt) => {
            edges.push(Edge {
              from: index[&prod.head],
              to: index[nt],
              production: prod_ix,
              position,
              leading,
              kind: RecursionKind::None,
            });
            leading &= first.is_nullable(nt);
          }
          Symbol::Terminal(_) | Symbol::EndOfInput => leading = false,
          Symbol::Epsilon => {}
        }
      }
    }

    let reach = closure(nodes.len(), &edges, |_| true);
    let left_reach = closure(nodes.len(), &edges, |e| e.leading);

    for edge in &mut edges {
      edge.kind = if edge.leading && edge.to == edge.from {
        RecursionKind::Left
      } else if edge.leading && left_reach[edge.to][edge.from] {
        RecursionKind::IndirectLeft
      } else if edge.to == edge.from || reach[edge.to][edge.from] {
        RecursionKind::Normal
      } else {
        RecursionKind::None
      };
    }

    DerivationGraph {
      nodes,
      index,
      edges,
      reach,
      left_reach,
    }
  }

  pub fn nodes(&self) -> &[NonTerminal] {
    &self.nodes
  }

  pub fn node_index(&self, nt: &NonTerminal) -> Option<usize> {
    self.index.get(nt).copied()
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  pub fn edges_of(&self, production: usize) -> impl Iterator<Item = &Edge> + '_ {
    self.edges.iter().filter(move |e| e.production == production)
  }

  /// Whether `to` is derivable from `from` in one or more steps.
  pub fn reaches(&self, from: &NonTerminal, to: &NonTerminal) -> bool {
    match (self.node_index(from), self.node_index(to)) {
      (Some(i), Some(j)) => self.reach[i][j],
      _ => false,
    }
  }

  /// Whether `to` appears at the left edge of some derivation of `from`.
  pub fn left_reaches(&self, from: &NonTerminal, to: &NonTerminal) -> bool {
    match (self.node_index(from), self.node_index(to)) {
      (Some(i), Some(j)) => self.left_reach[i][j],
      _ => false,
    }
  }

  /// Non-terminals that can derive themselves without consuming a terminal
  /// first.
  pub fn left_recursive(&self) -> Vec<&NonTerminal> {
    (0..self.nodes.len())
      .filter(|&i| self.left_reach[i][i])
      .map(|i| &self.nodes[i])
      .collect()
  }

  /// A shortest left-recursive cycle through `nt`, starting and ending
  /// with `nt`.
  pub fn left_cycle(&self, nt: &NonTerminal) -> Option<Vec<&NonTerminal>> {
    let start = self.node_index(nt)?;
    if !self.left_reach[start][start] {
      return None;
    }

    let mut parent = vec![None; self.nodes.len()];
    let mut visited = bitvec![0; self.nodes.len()];
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(i) = queue.pop_front() {
      for edge in self.edges.iter().filter(|e| e.leading && e.from == i) {
        if edge.to == start {
          let mut path = vec![&self.nodes[start]];
          let mut cur = i;
          let mut rev = vec![];
          while cur != start {
            rev.push(&self.nodes[cur]);
            cur = parent[cur]?;
          }
          path.extend(rev.into_iter().rev());
          path.push(&self.nodes[start]);
          return Some(path);
        }
        if !visited[edge.to] {
          visited.set(edge.to, true);
          parent[edge.to] = Some(i);
          queue.push_back(edge.to);
        }
      }
    }

    None
  }
}

/// Transitive closure over the edges accepted by `keep`.
fn closure(len: usize, edges: &[Edge], keep: impl Fn(&Edge) -> bool) -> Vec<BitVec> {
  let mut succ = vec![vec![]; len];
  for edge in edges.iter().filter(|e| keep(e)) {
    succ[edge.from].push(edge.to);
  }

  (0..len).map(|start| {
    let mut seen = bitvec![0; len];
    let mut queue = VecDeque::from(succ[start].clone());
    while let Some(i) = queue.pop_front() {
      if seen[i] {
        continue;
      }
      seen.set(i, true);
      queue.extend(succ[i].iter().copied());
    }
    seen
  }).collect()
}
