use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;
use crate::ast::{Argument, Declaration, Field, Lambda, Node, NodeKind};
use crate::lex::Span;
use crate::operator::{Operator, Shape};
use crate::token::{Literal, ObjectToken, Property, Token, ValueToken};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}", context_suffix(.context))]
pub struct ParseError {
  pub kind: ParseErrorKind,
  pub span: Span,
  /// Keys of the operators being parsed, outermost first.
  pub context: Vec<&'static str>,
}

fn context_suffix(context: &[&'static str]) -> String {
  if context.is_empty() {
    String::new()
  } else {
    format!(" (in {})", context.join(" > "))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
  UnknownOperator(String),
  MissingOperand {
    op: Operator,
    what: &'static str,
  },
  TooManyOperands {
    op: Operator,
    max: usize,
    found: usize,
  },
  MultipleOperators(usize),
  MixedKeys,
  DuplicateField(String),
  ExpectedProjection {
    found: &'static str,
  },
  InvalidReference(String),
  InvalidLiteral,
}

impl fmt::Display for ParseErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ParseErrorKind::UnknownOperator(key) => write!(f, "unknown operator `{}`", key),
      ParseErrorKind::MissingOperand { op, what } => write!(f, "missing {} of `{}`", what, op),
      ParseErrorKind::TooManyOperands { op, max, found } => {
        write!(f, "`{}` takes at most {} operand(s), found {}", op, max, found)
      }
      ParseErrorKind::MultipleOperators(n) => {
        write!(f, "operator object has {} keys, expected exactly one", n)
      }
      ParseErrorKind::MixedKeys => write!(f, "object mixes operator keys and field names"),
      ParseErrorKind::DuplicateField(name) => write!(f, "field `{}` is projected twice", name),
      ParseErrorKind::ExpectedProjection { found } => {
        write!(f, "`$project` expects a projection object, found {}", found)
      }
      ParseErrorKind::InvalidReference(text) => write!(f, "invalid reference `{}`", text),
      ParseErrorKind::InvalidLiteral => {
        write!(f, "`$literal` expects a string, number, boolean or null")
      }
    }
  }
}

/// Builds the syntax tree of a query from its token tree.
pub fn parse(token: &Token) -> Result<Node, ParseError> {
  Parser::default().node(token)
}

pub(crate) fn is_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  match chars.next() {
    Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
    _ => false,
  }
}

type Args<'a> = VecDeque<&'a Token>;

#[derive(Default)]
struct Parser {
  context: Vec<&'static str>,
}

impl Parser {
  fn error(&self, kind: ParseErrorKind, span: Span) -> ParseError {
    ParseError {
      kind,
      span,
      context: self.context.clone(),
    }
  }

  fn node(&mut self, token: &Token) -> Result<Node, ParseError> {
    match token {
      Token::Value(value) => self.value(value),
      Token::Array(array) => {
        let statements = array.elements.iter()
          .map(|element| self.node(element))
          .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::new(NodeKind::Block(statements), array.span))
      }
      Token::Object(object) => self.object(object),
    }
  }

  fn value(&self, token: &ValueToken) -> Result<Node, ParseError> {
    let kind = match &token.value {
      Literal::String(s) if s.starts_with('$') => {
        NodeKind::Reference(self.path(s, token.span)?)
      }
      literal => NodeKind::Literal(literal.clone()),
    };
    Ok(Node::new(kind, token.span))
  }

  fn path(&self, reference: &str, span: Span) -> Result<Vec<String>, ParseError> {
    let text = &reference[1..];
    if text.is_empty() {
      return Ok(vec![]);
    }

    text.split('.')
      .map(|segment| if is_identifier(segment) {
        Ok(segment.to_owned())
      } else {
        Err(self.error(ParseErrorKind::InvalidReference(reference.to_owned()), span))
      })
      .collect()
  }

  fn object(&mut self, object: &ObjectToken) -> Result<Node, ParseError> {
    let operators = object.properties.iter()
      .filter(|p| p.key.starts_with('$'))
      .count();

    if operators == 0 {
      return self.projection(object);
    }
    if operators != object.properties.len() {
      return Err(self.error(ParseErrorKind::MixedKeys, object.span));
    }
    if operators > 1 {
      return Err(self.error(
        ParseErrorKind::MultipleOperators(operators),
        object.properties[1].key_span,
      ));
    }

    let property = &object.properties[0];
    let op = match Operator::from_key(&property.key) {
      Some(op) => op,
      None => {
        return Err(self.error(
          ParseErrorKind::UnknownOperator(property.key.clone()),
          property.key_span,
        ));
      }
    };

    self.context.push(op.key());
    let node = self.operator(op, property, object.span);
    self.context.pop();
    node
  }

  fn projection(&mut self, object: &ObjectToken) -> Result<Node, ParseError> {
    let mut fields: Vec<Field> = vec![];

    for property in &object.properties {
      if fields.iter().any(|field| field.name.eq_ignore_ascii_case(&property.key)) {
        return Err(self.error(
          ParseErrorKind::DuplicateField(property.key.clone()),
          property.key_span,
        ));
      }
      fields.push(Field {
        name: property.key.clone(),
        span: property.key_span,
        value: self.node(&property.value)?,
      });
    }

    Ok(Node::new(NodeKind::Projection(fields), object.span))
  }

  fn operator(&mut self, op: Operator, property: &Property, span: Span) -> Result<Node, ParseError> {
    if op.shape() == Shape::Literal {
      return match &property.value {
        Token::Value(value) => Ok(Node::new(NodeKind::Literal(value.value.clone()), span)),
        other => Err(self.error(ParseErrorKind::InvalidLiteral, other.span())),
      };
    }

    let mut args: Args = match &property.value {
      Token::Array(array) => array.elements.iter().collect(),
      other => VecDeque::from([other]),
    };
    let found = args.len();

    let kind = match op.shape() {
      Shape::Unary => {
        let operand = self.operand(op, &mut args, "operand", span)?;
        NodeKind::Unary { op, operand: Box::new(operand) }
      }
      Shape::Binary => {
        let left = self.operand(op, &mut args, "left operand", span)?;
        let right = self.operand(op, &mut args, "right operand", span)?;
        NodeKind::Binary { op, left: Box::new(left), right: Box::new(right) }
      }
      Shape::OptionalLambda if args.len() <= 1 => {
        let source = match args.pop_front() {
          Some(token) => self.source(token)?,
          None => None,
        };
        NodeKind::Query { op, source, arg: Argument::None }
      }
      Shape::Lambda | Shape::OptionalLambda => {
        let param = if args.len() >= 2 { declaration(&mut args) } else { None };
        let source = if args.len() >= 2 {
          let token = self.take(op, &mut args, "source", span)?;
          self.source(token)?
        } else {
          None
        };
        let body = self.operand(op, &mut args, "lambda body", span)?;
        if op == Operator::Project && !matches!(body.kind, NodeKind::Projection(_)) {
          let found = match &body.kind {
            NodeKind::Literal(_) => "a literal",
            NodeKind::Reference(_) => "a reference",
            NodeKind::Block(_) => "a block",
            _ => "an operator",
          };
          return Err(self.error(ParseErrorKind::ExpectedProjection { found }, body.span));
        }
        NodeKind::Query {
          op,
          source,
          arg: Argument::Lambda(Lambda { param, body: Box::new(body) }),
        }
      }
      Shape::Counted => {
        let source = if args.len() >= 2 {
          let token = self.take(op, &mut args, "source", span)?;
          self.source(token)?
        } else {
          None
        };
        let count = self.operand(op, &mut args, "count", span)?;
        NodeKind::Query { op, source, arg: Argument::Operand(Box::new(count)) }
      }
      Shape::Literal => unreachable!(),
    };

    if let Some(extra) = args.front() {
      let max = match op.shape() {
        Shape::Unary => 1,
        Shape::Binary | Shape::Counted => 2,
        _ => 3,
      };
      return Err(self.error(ParseErrorKind::TooManyOperands { op, max, found }, extra.span()));
    }

    Ok(Node::new(kind, span))
  }

  fn take<'a>(
    &self,
    op: Operator,
    args: &mut Args<'a>,
    what: &'static str,
    span: Span,
  ) -> Result<&'a Token, ParseError> {
    args.pop_front()
      .ok_or_else(|| self.error(ParseErrorKind::MissingOperand { op, what }, span))
  }

  fn operand(
    &mut self,
    op: Operator,
    args: &mut Args,
    what: &'static str,
    span: Span,
  ) -> Result<Node, ParseError> {
    let token = self.take(op, args, what, span)?;
    self.node(token)
  }

  /// A source of `"$"` is the same as no source.
  fn source(&mut self, token: &Token) -> Result<Option<Box<Node>>, ParseError> {
    let node = self.node(token)?;
    Ok(match &node.kind {
      NodeKind::Reference(path) if path.is_empty() => None,
      _ => Some(Box::new(node)),
    })
  }
}

fn declaration(args: &mut Args) -> Option<Declaration> {
  let token = args.front()?;
  let name = token.as_str().filter(|s| is_identifier(s))?;
  let decl = Declaration {
    name: name.to_owned(),
    span: token.span(),
  };
  args.pop_front();
  Some(decl)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::tables::Tables;
  use crate::token::Tokenizer;
  use pretty_assertions::assert_eq;

  fn parse_text(text: &str) -> Result<Node, ParseError> {
    let tables = Tables::embedded();
    let token = Tokenizer::new(&tables, &Config::default()).tokenize(text).unwrap();
    parse(&token)
  }

  fn canonical(text: &str) -> String {
    parse_text(text).unwrap().to_string()
  }

  #[test]
  fn filter_with_declaration() {
    let node = parse_text(r#"{"$filter": ["x", {"$greater": ["$age", 18]}]}"#).unwrap();

    match &node.kind {
      NodeKind::Query { op: Operator::Filter, source: None, arg: Argument::Lambda(lambda) } => {
        assert_eq!(lambda.param.as_ref().map(|d| d.name.as_str()), Some("x"));
        assert_eq!(lambda.body.operator(), Some(Operator::Greater));
      }
      kind => panic!("unexpected node {:?}", kind),
    }
  }

  #[test]
  fn argument_shapes() {
    assert_eq!(canonical(r#"{"$not": "$active"}"#), r#"{"$not": ["$active"]}"#);
    assert_eq!(
      canonical(r#"{"$select": ["$tags", {"$literal": 1}]}"#),
      r#"{"$select": ["$tags", 1]}"#,
    );
    assert_eq!(
      canonical(r#"{"$filter": ["p", "$people", {"$less": ["$p.age", 3]}]}"#),
      r#"{"$filter": ["p", "$people", {"$less": ["$p.age", 3]}]}"#,
    );
    assert_eq!(canonical(r#"{"$limit": 5}"#), r#"{"$limit": [5]}"#);
    assert_eq!(canonical(r#"{"$skip": ["$tags", 2]}"#), r#"{"$skip": ["$tags", 2]}"#);
    assert_eq!(canonical(r#"{"$count": []}"#), r#"{"$count": []}"#);
    assert_eq!(canonical(r#"{"$count": "$tags"}"#), r#"{"$count": ["$tags"]}"#);
    assert_eq!(canonical(r#"{"$any": ["$", "$active"]}"#), r#"{"$any": ["$", "$active"]}"#);
    assert_eq!(canonical(r#"{"$any": ["t", {"$equals": ["$t", "a"]}]}"#),
      r#"{"$any": ["t", {"$equals": ["$t", "a"]}]}"#);
  }

  #[test]
  fn literals_and_references() {
    assert_eq!(canonical(r#"{"$literal": "$x"}"#), r#"{"$literal": "$x"}"#);
    assert_eq!(canonical(r#"{"$add": [1.0, -2]}"#), r#"{"$add": [1.0, -2]}"#);
    assert_eq!(canonical(r#"["$", "$a.b", "plain", null, true]"#),
      r#"["$", "$a.b", "plain", null, true]"#);
  }

  #[test]
  fn projection() {
    assert_eq!(
      canonical(r#"{"$project": [{"adultName": "$name", "n": {"$add": ["$age", 1]}}]}"#),
      r#"{"$project": [{"adultName": "$name", "n": {"$add": ["$age", 1]}}]}"#,
    );

    let err = parse_text(r#"{"$project": ["$name"]}"#).unwrap_err();
    assert_eq!(err.to_string(), "`$project` expects a projection object, found a reference (in $project)");
  }

  #[test]
  fn unknown_operator() {
    let err = parse_text(r#"{"$filter": [{"$bogus": [1]}]}"#).unwrap_err();

    assert_eq!(err.kind, ParseErrorKind::UnknownOperator("$bogus".to_owned()));
    assert_eq!(err.span, Span::new(14, 22));
    assert_eq!(err.context, vec!["$filter"]);
    assert_eq!(err.to_string(), "unknown operator `$bogus` (in $filter)");
  }

  #[test]
  fn missing_operands() {
    let err = parse_text(r#"{"$filter": ["x", {"$greater": ["$age"]}]}"#).unwrap_err();
    assert_eq!(err.to_string(), "missing right operand of `$greater` (in $filter > $greater)");
    assert_eq!(err.span, Span::new(18, 40));

    let err = parse_text(r#"{"$filter": []}"#).unwrap_err();
    assert_eq!(err.to_string(), "missing lambda body of `$filter` (in $filter)");
  }

  #[test]
  fn too_many_operands() {
    let err = parse_text(r#"{"$add": [1, 2, 3]}"#).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::TooManyOperands { op: Operator::Add, max: 2, found: 3 });
    assert_eq!(err.span, Span::new(16, 17));
  }

  #[test]
  fn malformed_objects() {
    let err = parse_text(r#"{"$add": [1, 2], "name": 1}"#).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MixedKeys);

    let err = parse_text(r#"{"$add": [1, 2], "$not": true}"#).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MultipleOperators(2));

    let err = parse_text(r#"{"a": 1, "A": 2}"#).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DuplicateField("A".to_owned()));

    let err = parse_text(r#""$a..b""#).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidReference("$a..b".to_owned()));

    let err = parse_text(r#"{"$literal": [1]}"#).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidLiteral);
  }

  #[test]
  fn identifiers() {
    assert!(is_identifier("x"));
    assert!(is_identifier("_item2"));
    assert!(!is_identifier("2x"));
    assert!(!is_identifier("a b"));
    assert!(!is_identifier(""));
  }
}
