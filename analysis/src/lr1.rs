//! LR(1) automata. The canonical collection keeps every distinct kernel
//! (with lookaheads) as its own state; the LALR(1) variant merges states
//! whose kernels share the same core and unions their lookaheads.

use std::collections::BTreeSet;
use std::fmt::{self, Write};
use grammar::{ProductionRule, ProductionSet, Symbol};
use tracing::debug;
use crate::first::{self, FirstTable};
use crate::{augment, Error, Map};

mod states;
mod tables;
mod driver;

pub use tables::{Action, LrTable};
pub use driver::LrRecognizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LrKind {
  Canonical,
  Lalr,
}

impl fmt::Display for LrKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(match self {
      LrKind::Canonical => "LR(1)",
      LrKind::Lalr => "LALR(1)",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lr1Item {
  pub production: usize,
  pub dot: usize,
  pub lookaheads: BTreeSet<Symbol>,
}

#[derive(Debug, Clone)]
pub struct Lr1State {
  /// Kernel items first, then the closure.
  pub items: Vec<Lr1Item>,
  pub kernel_len: usize,
  pub transitions: Map<Symbol, usize>,
}

impl Lr1State {
  fn new(kernel: Vec<Lr1Item>) -> Self {
    Lr1State {
      kernel_len: kernel.len(),
      items: kernel,
      transitions: Map::default(),
    }
  }

  pub fn kernel(&self) -> &[Lr1Item] {
    &self.items[..self.kernel_len]
  }
}

/// The item-set automaton of an augmented grammar. State 0 is the start
/// state and production 0 is `S' -> S`.
#[derive(Debug, Clone)]
pub struct Automaton {
  kind: LrKind,
  productions: Vec<ProductionRule>,
  states: Vec<Lr1State>,
}

impl Automaton {
  pub fn build(set: &ProductionSet, kind: LrKind) -> Result<Self, Error> {
    let augmented = augment::augment(set)?;
    let first = FirstTable::compute(&augmented);
    let heads = first::index_by_head(&augmented);
    let prods = augmented.productions();

    let states = match kind {
      LrKind::Canonical => states::gen_states::<states::CanonicalComputation>(prods, &heads, &first),
      LrKind::Lalr => states::gen_states::<states::LalrComputation>(prods, &heads, &first),
    };

    debug!(%kind, states = states.len(), "automaton built");

    Ok(Automaton {
      kind,
      productions: prods.to_vec(),
      states,
    })
  }

  pub fn kind(&self) -> LrKind {
    self.kind
  }

  pub fn productions(&self) -> &[ProductionRule] {
    &self.productions
  }

  pub fn states(&self) -> &[Lr1State] {
    &self.states
  }

  pub fn item_to_string(&self, item: &Lr1Item) -> String {
    let mut s = String::new();
    self.fmt_item(item, &mut s).unwrap();
    s
  }

  fn fmt_item(&self, item: &Lr1Item, f: &mut impl Write) -> fmt::Result {
    let prod = &self.productions[item.production];
    write!(f, "{} ->", prod.head)?;

    let symbols = if prod.body.is_epsilon() {
      &[][..]
    } else {
      prod.body.symbols()
    };

    for (i, sym) in symbols.iter().enumerate() {
      if i == item.dot {
        write!(f, " .")?;
      }
      write!(f, " {}", sym)?;
    }

    if item.dot == symbols.len() {
      write!(f, " .")?;
    }

    let lookaheads = item.lookaheads.iter()
      .map(|s| s.to_string())
      .collect::<Vec<_>>();
    write!(f, "      {}", lookaheads.join("/"))
  }
}

impl fmt::Display for Automaton {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for (i, state) in self.states.iter().enumerate() {
      writeln!(f, "State {}:", i)?;
      for item in &state.items {
        write!(f, "  ")?;
        self.fmt_item(item, f)?;
        writeln!(f)?;
      }
      for (sym, next) in &state.transitions {
        writeln!(f, "  {} => {}", sym, next)?;
      }
      writeln!(f)?;
    }
    Ok(())
  }
}
