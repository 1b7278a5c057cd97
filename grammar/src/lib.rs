//! Grammar model: terminals and non-terminals, sentences, production rules,
//! and the mutable [`ProductionSet`] the analysis passes rewrite.

mod symbol;
mod sentence;
mod production;
mod production_set;
mod transform;
mod error;
pub mod grammar_parser;

pub use symbol::{Symbol, Terminal, NonTerminal};
pub use sentence::Sentence;
pub use production::ProductionRule;
pub use production_set::{ProductionSet, ProductionSetBuilder, AlternationMacro};
pub use transform::{TransformLog, SetTransformation, Change, Pass};
pub use error::{GrammarError, SyntaxErrorKind, ValidationError};

pub type Map<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;
pub type Set<K> = indexmap::IndexSet<K, fnv::FnvBuildHasher>;

/// Parses grammar text and expands its alternation macros.
pub fn build(input: &str) -> Result<ProductionSet, GrammarError> {
  build_logged(input, &mut TransformLog::new())
}

pub fn build_logged(
  input: &str,
  log: &mut TransformLog,
) -> Result<ProductionSet, GrammarError> {
  let mut set = grammar_parser::parse(input)?;
  set.ensure_no_macros(log);
  Ok(set)
}
