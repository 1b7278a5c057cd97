use analysis::{
  DerivationGraph, Error, FirstTable, Ll1Table, LrKind, LrTable, Recognizer, Step, RecognizeError,
};
use grammar::{Pass, ProductionSet, Symbol, TransformLog};
use pretty_assertions::assert_eq;

static LIST: &str = r#"
%token lb
%token rb
%token comma
%token item

%start list

list = lb rb
  | lb elems rb
elems = elems comma elem
  | elem
elem = item
  | list
"#;

fn normalized(input: &str) -> (ProductionSet, TransformLog) {
  let mut log = TransformLog::new();
  let mut set = grammar::build_logged(input, &mut log).unwrap();
  analysis::normalize(&mut set, &mut log).unwrap();
  (set, log)
}

fn run(mut recognizer: impl Recognizer, input: &str) -> Result<Step, RecognizeError> {
  for tag in input.split_whitespace() {
    recognizer.feed(&Symbol::terminal(tag))?;
  }
  recognizer.feed(&Symbol::EndOfInput)
}

#[test]
fn normalized_grammar_is_ll1() {
  let (set, log) = normalized(LIST);

  assert_eq!(set.to_string(), "\
list -> lb list'
elem -> item | list
elems -> elem elems'
elems' -> comma elem elems' | ε
list' -> rb | elems rb
");
  assert!(log.count(Pass::LeftRecursion) > 0);
  assert!(log.count(Pass::LeftFactorization) > 0);

  let first = FirstTable::compute(&set);
  assert!(DerivationGraph::build(&set, &first).left_recursive().is_empty());
  assert!(Ll1Table::build(&set).is_ok());
}

#[test]
fn all_tables_agree() {
  let original = grammar::build(LIST).unwrap();
  let (normalized, _) = normalized(LIST);

  let ll1 = Ll1Table::build(&normalized).unwrap();
  let lr1 = LrTable::build(&original, LrKind::Canonical).unwrap();
  let lalr = LrTable::build(&original, LrKind::Lalr).unwrap();

  let accepted = [
    "lb rb",
    "lb item rb",
    "lb item comma lb rb comma item rb",
    "lb lb lb item rb rb rb",
  ];
  let rejected = [
    "lb",
    "lb item comma rb",
    "lb item item rb",
    "rb",
  ];

  for input in accepted {
    assert_eq!(run(ll1.recognizer(), input), Ok(Step::Accepted), "LL(1): {}", input);
    assert_eq!(run(lr1.recognizer(), input), Ok(Step::Accepted), "LR(1): {}", input);
    assert_eq!(run(lalr.recognizer(), input), Ok(Step::Accepted), "LALR(1): {}", input);
  }

  for input in rejected {
    assert!(run(ll1.recognizer(), input).is_err(), "LL(1): {}", input);
    assert!(run(lr1.recognizer(), input).is_err(), "LR(1): {}", input);
    assert!(run(lalr.recognizer(), input).is_err(), "LALR(1): {}", input);
  }
}

#[test]
fn transform_log_replays() {
  let (_, log) = normalized("%token a\n%token b\nA = A a | b\n");

  assert_eq!(log.to_string(), "\
+ [macro-expansion] A -> A a
+ [macro-expansion] A -> b
- [left-recursion] A -> A a
- [left-recursion] A -> b
+ [left-recursion] A -> b A'
+ [left-recursion] A' -> a A'
+ [left-recursion] A' -> ε
");
}

#[test]
fn rejects_non_productive_grammars() {
  let rejected = [
    "%token a\n%token b\ns = x b\nx = x a\n",
    "%token a\n%token b\ns = x b\nx = x a | x x\n",
  ];

  for input in rejected {
    let mut set = grammar::build(input).unwrap();
    let err = analysis::normalize(&mut set, &mut TransformLog::new()).unwrap_err();

    assert!(matches!(err, Error::NonProductive(ref nt) if nt == "x"), "{}: {}", input, err);
    assert_eq!(
      analysis::report::report("g.grammar", input, &err),
      "non-terminal x has only left-recursive productions\n\n  it derives no terminal string\n");
  }
}
