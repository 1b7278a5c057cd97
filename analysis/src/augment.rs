use grammar::{GrammarError, ProductionSet, Sentence};

/// Adds `S' -> S` in front of every other production and makes `S'` the
/// start symbol. The new production has index 0.
pub(crate) fn augment(set: &ProductionSet) -> Result<ProductionSet, GrammarError> {
  set.assert_no_macros();

  let start = set.fresh_nonterminal(set.start());
  let mut builder = ProductionSet::builder()
    .start(start.clone())
    .production(start, Sentence::new(vec![set.start().clone().into()]));

  for prod in set.productions() {
    builder = builder.production(prod.head.clone(), prod.body.clone());
  }

  Ok(builder.build()?)
}
