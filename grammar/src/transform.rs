use std::fmt;
use super::production::ProductionRule;

/// The pass that produced a change in a production set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
  MacroExpansion,
  DuplicateRemoval,
  LeftRecursion,
  LeftFactorization,
}

impl fmt::Display for Pass {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(match self {
      Pass::MacroExpansion => "macro-expansion",
      Pass::DuplicateRemoval => "duplicate-removal",
      Pass::LeftRecursion => "left-recursion",
      Pass::LeftFactorization => "left-factorization",
    })
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
  Added(ProductionRule),
  Removed(ProductionRule),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetTransformation {
  pub pass: Pass,
  pub change: Change,
}

/// Append-only record of every rewrite applied to a production set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransformLog {
  entries: Vec<SetTransformation>,
}

impl TransformLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, pass: Pass, change: Change) {
    tracing::trace!(%pass, ?change, "grammar rewrite");
    self.entries.push(SetTransformation { pass, change });
  }

  pub fn entries(&self) -> &[SetTransformation] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Entries recorded after `mark`, a value previously returned by `len`.
  pub fn since(&self, mark: usize) -> &[SetTransformation] {
    &self.entries[mark.min(self.entries.len())..]
  }

  pub fn count(&self, pass: Pass) -> usize {
    self.entries.iter().filter(|e| e.pass == pass).count()
  }
}

impl fmt::Display for TransformLog {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for entry in &self.entries {
      match &entry.change {
        Change::Added(rule) => writeln!(f, "+ [{}] {}", entry.pass, rule)?,
        Change::Removed(rule) => writeln!(f, "- [{}] {}", entry.pass, rule)?,
      }
    }
    Ok(())
  }
}
