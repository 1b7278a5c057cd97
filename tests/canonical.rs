use pretty_assertions::assert_eq;
use webql::ast::{Argument, Lambda, NodeKind};
use webql::Compiler;

const QUERIES: &[&str] = &[
  r#"{"$filter": ["x", {"$greater": ["$age", 18]}]}"#,
  r#"{ "$project" : [ { "adultName" : "$name" } ] }"#,
  r#"[{"$orderBy": "$age"}, {"$skip": 1}, {"$limit": 2}, {"$index": 0}]"#,
  r#"{"$count": ["$", {"$regexMatch": ["$name", "^A\\w+"]}]}"#,
  r#"{"$any": ["t", "$tags", {"$equals": ["$t", {"$literal": "$admin"}]}]}"#,
  r#"{"$select": {"$negate": {"$modulo": ["$age", 7]}}}"#,
  r#"{"$select": {"$or": [{"$not": "$active"}, {"$equals": ["$score", null]}]}}"#,
  r#"{"$sum": ["$", {"$multiply": ["$score", 1.5e2]}]}"#,
  r#"{"$selectMany": ["p", "$friends", "$p.tags"]}"#,
  r#"{"$max": "$friends"}"#,
  r#"[]"#,
  r#"{"$count": [{"$literal": "abc"}, {"$equals": ["$", "a"]}]}"#,
];

#[test]
fn printing_is_idempotent() {
  let compiler = Compiler::default();

  for text in QUERIES {
    let first = compiler.parse(text).unwrap();
    let printed = first.to_string();
    let second = compiler.parse(&printed)
      .unwrap_or_else(|err| panic!("{} does not parse: {}", printed, err));

    assert_eq!(second.to_string(), printed, "{}", text);
  }
}

#[test]
fn canonical_forms() {
  let canonical = |text: &str| Compiler::default().parse(text).unwrap().to_string();

  insta::assert_snapshot!(
    canonical(r#"{ "$project" : [ { "adultName" : "$name" } ] }"#),
    @r#"{"$project": [{"adultName": "$name"}]}"#
  );
  insta::assert_snapshot!(
    canonical(r#"{"$any": ["t", "$tags", {"$equals": ["$t", {"$literal": "$admin"}]}]}"#),
    @r#"{"$any": ["t", "$tags", {"$equals": ["$t", {"$literal": "$admin"}]}]}"#
  );
  insta::assert_snapshot!(
    canonical(r#"{"$count": ["$", {"$greater": ["$age", 1.0]}]}"#),
    @r#"{"$count": ["$", {"$greater": ["$age", 1.0]}]}"#
  );
  insta::assert_snapshot!(canonical(r#"{"$limit": [2]}"#), @r#"{"$limit": [2]}"#);
}

#[test]
fn identifier_sources_stay_sources() {
  let compiler = Compiler::default();
  let text = r#"{"$count": [{"$literal": "abc"}, {"$equals": ["$", "a"]}]}"#;

  let printed = compiler.parse(text).unwrap().to_string();
  assert_eq!(printed, text);

  match compiler.parse(&printed).unwrap().kind {
    NodeKind::Query { source: Some(source), arg: Argument::Lambda(Lambda { param: None, .. }), .. } => {
      assert_eq!(source.to_string(), r#""abc""#);
    }
    other => panic!("unexpected reparse: {:?}", other),
  }
}
