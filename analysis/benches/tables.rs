use analysis::{LrKind, LrTable, Ll1Table};
use grammar::TransformLog;

static WEBQL: &str = include_str!("../../src/webql.grammar");

fn lalr() {
  let set = grammar::build(WEBQL).unwrap();
  let _table = LrTable::build(&set, LrKind::Lalr).unwrap();
}

fn canonical() {
  let set = grammar::build(WEBQL).unwrap();
  let _table = LrTable::build(&set, LrKind::Canonical).unwrap();
}

fn ll1() {
  let mut log = TransformLog::new();
  let mut set = grammar::build_logged(WEBQL, &mut log).unwrap();
  analysis::normalize(&mut set, &mut log).unwrap();
  let _table = Ll1Table::build(&set).unwrap();
}

use criterion::{criterion_group, criterion_main, Criterion};

fn table_benchmark(c: &mut Criterion) {
  c.bench_function("webql lalr", |b| b.iter(|| lalr()));
  c.bench_function("webql canonical", |b| b.iter(|| canonical()));
  c.bench_function("webql ll1", |b| b.iter(|| ll1()));
}

criterion_group!{
  name = benches;
  config = Criterion::default().significance_level(0.1).sample_size(10);
  targets = table_benchmark
}
criterion_main!(benches);
