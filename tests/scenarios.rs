use std::thread;
use pretty_assertions::assert_eq;
use serde_json::json;
use webql::bind::BindingErrorKind;
use webql::lex::LexErrorKind;
use webql::operator::Operator;
use webql::parse::ParseErrorKind;
use webql::{Compiler, Config, Error, Span, TableKind, Type};

fn person() -> Type {
  Type::from_schema(json!({
    "name": "Person",
    "fields": {
      "Name": "string",
      "Age": "int",
      "Score": "float",
      "Tags": ["string"],
      "Friends": [{
        "name": "Friend",
        "fields": { "Name": "string", "Age": "int" }
      }]
    }
  })).unwrap()
}

fn compile(text: &str) -> String {
  Compiler::default().compile(text, &person()).unwrap().to_string()
}

#[test]
fn filter() {
  insta::assert_snapshot!(
    compile(r#"{"$filter": ["x", {"$greater": ["$age", 18]}]}"#),
    @"source.Where(x => (x.Age > 18))"
  );
}

#[test]
fn project() {
  let query = Compiler::default()
    .compile(r#"{"$project": [{"adultName": "$name"}]}"#, &person())
    .unwrap();

  insta::assert_snapshot!(query.to_string(), @"source.Select(x => new {adultName = x.Name})");
  assert_eq!(query.output_type().to_string(), "[{adultName: string}]");
}

#[test]
fn pipelines() {
  insta::assert_snapshot!(
    compile(r#"[
      {"$filter": {"$and": [{"$greaterEquals": ["$age", 18]}, {"$like": ["$name", "A%"]}]}},
      {"$orderByDescending": "$score"},
      {"$skip": 1},
      {"$limit": 10},
      {"$select": "$name"}
    ]"#),
    @r#"source.Where(x => ((x.Age >= 18) && Like(x.Name, "A%"))).OrderByDescending(x => x.Score).Skip(1).Take(10).Select(x => x.Name)"#
  );
  insta::assert_snapshot!(
    compile(r#"{"$select": ["p", {"$count": ["$p.friends", {"$less": ["$age", "$p.age"]}]}]}"#),
    @"source.Select(p => p.Friends.Count(x => (x.Age < p.Age)))"
  );
  insta::assert_snapshot!(
    compile(r#"{"$average": ["$", {"$sum": ["$friends", "$age"]}]}"#),
    @"source.Average(x => x.Friends.Sum(x1 => x1.Age))"
  );
}

#[test]
fn unknown_operator() {
  let err = Compiler::default().compile(r#"{"$bogus": [1, 2]}"#, &person()).unwrap_err();

  assert!(err.is_invalid_query());
  match err {
    Error::Parse(err) => {
      assert_eq!(err.kind, ParseErrorKind::UnknownOperator("$bogus".to_owned()));
      assert_eq!(err.span, Span::new(1, 9));
    }
    err => panic!("unexpected error {:?}", err),
  }
}

#[test]
fn three_operand_comparison() {
  let text = r#"{"$filter": ["result", "$age", {"$greater": ["x", "$age", 18]}]}"#;
  let err = Compiler::default().compile(text, &person()).unwrap_err();

  assert!(err.is_invalid_query());
  match err {
    Error::Parse(err) => {
      assert_eq!(
        err.kind,
        ParseErrorKind::TooManyOperands { op: Operator::Greater, max: 2, found: 3 },
      );
      assert_eq!(err.span, Span::new(58, 60));
      assert_eq!(&text[err.span.start..err.span.end], "18");
      assert_eq!(
        err.to_string(),
        "`$greater` takes at most 2 operand(s), found 3 (in $filter > $greater)",
      );
    }
    err => panic!("unexpected error {:?}", err),
  }
}

#[test]
fn nonexistent_field() {
  let err = Compiler::default()
    .compile(r#"{"$filter": {"$equals": ["$nonexistentField", 1]}}"#, &person())
    .unwrap_err();

  assert!(err.is_invalid_query());
  match err {
    Error::Binding(err) => assert_eq!(err.kind, BindingErrorKind::Unresolved {
      name: "nonexistentField".to_owned(),
      searched: person(),
    }),
    err => panic!("unexpected error {:?}", err),
  }
}

#[test]
fn every_table_kind_accepts_the_same_queries() {
  let text = r#"{"$project": [{"n": "$name", "t": {"$index": ["$tags", 0]}}]}"#;
  let bad = r#"{"$filter": [1, 2}"#;

  for table in [TableKind::Ll1, TableKind::Lr1, TableKind::Lalr] {
    let compiler = Compiler::new(Config { table, ..Config::default() }).unwrap();

    assert_eq!(
      compiler.compile(text, &person()).unwrap().to_string(),
      "source.Select(x => new {n = x.Name, t = x.Tags.ElementAt(0)})",
    );
    match compiler.compile(bad, &person()).unwrap_err() {
      Error::Lex(err) => assert_eq!(err.span, Span::new(17, 18), "{}", table),
      err => panic!("unexpected error {:?} with {}", err, table),
    }
  }
}

#[test]
fn text_limits() {
  let compiler = Compiler::new(Config { max_depth: 2, ..Config::default() }).unwrap();

  assert!(compiler.compile(r#"{"$count": []}"#, &person()).is_ok());
  match compiler.compile(r#"{"$count": [[]]}"#, &person()).unwrap_err() {
    Error::Lex(err) => assert_eq!(err.kind, LexErrorKind::TooDeep { limit: 2 }),
    err => panic!("unexpected error {:?}", err),
  }
}

#[test]
fn compilers_are_shared_between_threads() {
  let compiler = Compiler::default();
  let person = person();

  let results = thread::scope(|scope| {
    let handles = (0..4)
      .map(|n| {
        let (compiler, person) = (&compiler, &person);
        scope.spawn(move || {
          let text = format!(r#"{{"$limit": {}}}"#, n);
          compiler.compile(&text, person).unwrap().to_string()
        })
      })
      .collect::<Vec<_>>();
    handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
  });

  assert_eq!(results, vec![
    "source.Take(0)",
    "source.Take(1)",
    "source.Take(2)",
    "source.Take(3)",
  ]);
}
