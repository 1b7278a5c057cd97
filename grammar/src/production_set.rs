use std::fmt;
use std::fs;
use std::path::Path;
use std::collections::VecDeque;
use super::symbol::{NonTerminal, Symbol, Terminal};
use super::sentence::Sentence;
use super::production::ProductionRule;
use super::transform::{TransformLog, Pass, Change};
use super::error::{GrammarError, ValidationError};
use crate::{Map, Set};

/// A rule whose alternatives were written with `|`. Expanded into ordinary
/// productions by [`ProductionSet::ensure_no_macros`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternationMacro {
  pub head: NonTerminal,
  pub alternatives: Vec<Sentence>,
}

#[derive(Clone, Debug)]
pub struct ProductionSet {
  start: NonTerminal,
  productions: Vec<ProductionRule>,
  macros: Vec<AlternationMacro>,
}

#[derive(Default)]
pub struct ProductionSetBuilder {
  start: Option<NonTerminal>,
  productions: Vec<ProductionRule>,
  macros: Vec<AlternationMacro>,
}

impl ProductionSetBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn start(mut self, start: NonTerminal) -> Self {
    self.start = Some(start);
    self
  }

  pub fn production(mut self, head: NonTerminal, body: Sentence) -> Self {
    self.productions.push(ProductionRule::new(head, body));
    self
  }

  /// `head -> alt1 | alt2 | ...`. A single alternative is stored as an
  /// ordinary production.
  pub fn alternatives(mut self, head: NonTerminal, mut alternatives: Vec<Sentence>) -> Self {
    if alternatives.len() == 1 {
      let body = alternatives.pop().unwrap();
      return self.production(head, body);
    }

    self.macros.push(AlternationMacro {
      head,
      alternatives,
    });
    self
  }

  /// Validates the rules. The start symbol defaults to the head of the
  /// first rule.
  pub fn build(self) -> Result<ProductionSet, ValidationError> {
    let first_head = self.productions.first()
      .map(|p| &p.head)
      .or_else(|| self.macros.first().map(|m| &m.head))
      .cloned()
      .ok_or(ValidationError::Empty)?;

    let set = ProductionSet {
      start: self.start.unwrap_or(first_head),
      productions: self.productions,
      macros: self.macros,
    };

    set.validate()?;
    Ok(set)
  }
}

impl ProductionSet {
  pub fn builder() -> ProductionSetBuilder {
    ProductionSetBuilder::new()
  }

  /// Reads and builds a grammar file. The file is closed before parsing
  /// begins.
  pub fn load(path: impl AsRef<Path>) -> Result<ProductionSet, GrammarError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path)
      .map_err(|source| GrammarError::Io {
        path: path.to_owned(),
        source,
      })?;

    crate::build(&input)
  }

  pub fn start(&self) -> &NonTerminal {
    &self.start
  }

  pub fn productions(&self) -> &[ProductionRule] {
    &self.productions
  }

  pub fn len(&self) -> usize {
    self.productions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.productions.is_empty()
  }

  pub fn has_macros(&self) -> bool {
    !self.macros.is_empty()
  }

  pub fn productions_of<'a>(
    &'a self,
    head: &'a NonTerminal,
  ) -> impl Iterator<Item = (usize, &'a ProductionRule)> + 'a {
    self.productions.iter()
      .enumerate()
      .filter(move |(_, p)| p.head == *head)
  }

  pub fn bodies_of(&self, head: &NonTerminal) -> Vec<Sentence> {
    self.productions_of(head)
      .map(|(_, p)| p.body.clone())
      .collect()
  }

  pub fn contains(&self, rule: &ProductionRule) -> bool {
    self.productions.contains(rule)
  }

  /// Heads in order of first appearance, the start symbol first.
  pub fn nonterminals(&self) -> Vec<NonTerminal> {
    let mut nts = Set::<NonTerminal>::default();
    nts.insert(self.start.clone());
    for p in &self.productions {
      nts.insert(p.head.clone());
    }
    for m in &self.macros {
      nts.insert(m.head.clone());
    }
    nts.into_iter().collect()
  }

  pub fn terminals(&self) -> Set<Terminal> {
    let bodies = self.productions.iter()
      .map(|p| &p.body)
      .chain(self.macros.iter().flat_map(|m| &m.alternatives));

    let mut terminals = Set::default();
    for body in bodies {
      for sym in body {
        if let Symbol::Terminal(t) = sym {
          terminals.insert(t.clone());
        }
      }
    }
    terminals
  }

  /// Panics when alternation macros have not been expanded yet. Every
  /// transformation pass calls this first.
  pub fn assert_no_macros(&self) {
    assert!(
      self.macros.is_empty(),
      "grammar transformation called before alternation macros were expanded");
  }

  pub fn ensure_no_macros(&mut self, log: &mut TransformLog) {
    for m in std::mem::take(&mut self.macros) {
      for body in m.alternatives {
        self.add(ProductionRule::new(m.head.clone(), body), Pass::MacroExpansion, log);
      }
    }
  }

  /// Appends `rule` unless an equal production is already present.
  pub fn add(&mut self, rule: ProductionRule, pass: Pass, log: &mut TransformLog) -> bool {
    if self.productions.contains(&rule) {
      return false;
    }

    log.record(pass, Change::Added(rule.clone()));
    self.productions.push(rule);
    true
  }

  pub fn remove(&mut self, rule: &ProductionRule, pass: Pass, log: &mut TransformLog) -> bool {
    match self.productions.iter().position(|p| p == rule) {
      Some(i) => {
        let removed = self.productions.remove(i);
        log.record(pass, Change::Removed(removed));
        true
      }
      None => false,
    }
  }

  pub fn remove_duplicates(&mut self, log: &mut TransformLog) -> usize {
    self.assert_no_macros();

    let mut seen = Set::<ProductionRule>::default();
    let mut removed = 0;
    let mut kept = Vec::with_capacity(self.productions.len());

    for rule in std::mem::take(&mut self.productions) {
      if seen.insert(rule.clone()) {
        kept.push(rule);
      } else {
        log.record(Pass::DuplicateRemoval, Change::Removed(rule));
        removed += 1;
      }
    }

    self.productions = kept;
    removed
  }

  /// Groups the productions of `head` by their leading symbol, keeping only
  /// groups with at least two members. Indices point into `productions()`.
  pub fn common_prefix_groups(&self, head: &NonTerminal) -> Vec<(Symbol, Vec<usize>)> {
    let mut groups = Map::<Symbol, Vec<usize>>::default();
    for (i, p) in self.productions_of(head) {
      if !p.body.is_epsilon() {
        groups.entry(p.body.first().clone()).or_default().push(i);
      }
    }

    groups.into_iter()
      .filter(|(_, members)| members.len() > 1)
      .collect()
  }

  /// A non-terminal named after `base` with enough primes appended to be
  /// unused in this set.
  pub fn fresh_nonterminal(&self, base: &NonTerminal) -> NonTerminal {
    let used = self.nonterminals();
    let mut name = format!("{}'", base.name());
    while used.iter().any(|nt| nt.name() == name) {
      name.push('\'');
    }
    NonTerminal::new(name)
  }

  fn validate(&self) -> Result<(), ValidationError> {
    let heads = self.nonterminals()
      .into_iter()
      .filter(|nt| self.defines(nt))
      .collect::<Set<_>>();

    if !heads.contains(&self.start) {
      return Err(ValidationError::UndefinedStart(self.start.name().to_owned()));
    }

    for (head, body) in self.all_bodies() {
      for sym in body {
        if let Symbol::NonTerminal(nt) = sym {
          if !heads.contains(nt) {
            return Err(ValidationError::UndefinedNonTerminal {
              name: nt.name().to_owned(),
              rule: format!("{} -> {}", head, body),
            });
          }
        }
      }
    }

    let mut reached = Set::<NonTerminal>::default();
    let mut queue = VecDeque::new();
    reached.insert(self.start.clone());
    queue.push_back(self.start.clone());

    while let Some(nt) = queue.pop_front() {
      for (head, body) in self.all_bodies() {
        if *head != nt {
          continue;
        }
        for sym in body {
          if let Symbol::NonTerminal(next) = sym {
            if reached.insert(next.clone()) {
              queue.push_back(next.clone());
            }
          }
        }
      }
    }

    match heads.iter().find(|nt| !reached.contains(*nt)) {
      Some(nt) => Err(ValidationError::Unreachable(nt.name().to_owned())),
      None => Ok(()),
    }
  }

  fn defines(&self, nt: &NonTerminal) -> bool {
    self.productions.iter().any(|p| p.head == *nt)
      || self.macros.iter().any(|m| m.head == *nt)
  }

  fn all_bodies(&self) -> impl Iterator<Item = (&NonTerminal, &Sentence)> {
    self.productions.iter()
      .map(|p| (&p.head, &p.body))
      .chain(self.macros.iter().flat_map(|m| {
        m.alternatives.iter().map(move |alt| (&m.head, alt))
      }))
  }
}

impl fmt::Display for ProductionSet {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for nt in self.nonterminals() {
      let bodies = self.all_bodies()
        .filter(|(head, _)| **head == nt)
        .map(|(_, body)| body.to_string())
        .collect::<Vec<_>>();

      if !bodies.is_empty() {
        writeln!(f, "{} -> {}", nt, bodies.join(" | "))?;
      }
    }
    Ok(())
  }
}
