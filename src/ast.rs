//! Abstract syntax of a query. `Display` prints the canonical query text,
//! which parses back to the same tree.

use std::fmt;
use itertools::Itertools;
use crate::lex::Span;
use crate::operator::{Operator, Shape};
use crate::parse::is_identifier;
use crate::token::{quote, Literal};

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
  pub kind: NodeKind,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
  Literal(Literal),
  /// Member path from the current value. Empty for `"$"` itself.
  Reference(Vec<String>),
  Unary {
    op: Operator,
    operand: Box<Node>,
  },
  Binary {
    op: Operator,
    left: Box<Node>,
    right: Box<Node>,
  },
  /// A collection operator. A missing source means the current value.
  Query {
    op: Operator,
    source: Option<Box<Node>>,
    arg: Argument,
  },
  Projection(Vec<Field>),
  /// Statements applied one after another, each to the previous result.
  Block(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
  None,
  Lambda(Lambda),
  Operand(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
  pub param: Option<Declaration>,
  pub body: Box<Node>,
}

/// A lambda parameter name.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
  pub name: String,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  pub name: String,
  pub span: Span,
  pub value: Node,
}

impl Node {
  pub fn new(kind: NodeKind, span: Span) -> Self {
    Node { kind, span }
  }

  /// The operator this node applies, if any.
  pub fn operator(&self) -> Option<Operator> {
    match &self.kind {
      NodeKind::Unary { op, .. } | NodeKind::Binary { op, .. } | NodeKind::Query { op, .. } => {
        Some(*op)
      }
      _ => None,
    }
  }
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match &self.kind {
      NodeKind::Literal(Literal::String(s)) if s.starts_with('$') => {
        write!(f, "{{{}: {}}}", quote(Operator::Literal.key()), quote(s))
      }
      NodeKind::Literal(literal) => write!(f, "{}", literal),
      NodeKind::Reference(path) => write!(f, "{}", quote(&format!("${}", path.join(".")))),
      NodeKind::Unary { op, operand } => write_operator(f, *op, &[operand.to_string()]),
      NodeKind::Binary { op, left, right } => {
        write_operator(f, *op, &[left.to_string(), right.to_string()])
      }
      NodeKind::Query { op, source, arg } => {
        let mut args = vec![];
        if let Argument::Lambda(Lambda { param: Some(param), .. }) = arg {
          args.push(quote(&param.name));
        }
        match source {
          // a bare identifier in first place would read as a declaration
          Some(source) => match &source.kind {
            NodeKind::Literal(Literal::String(s)) if is_identifier(s) => {
              args.push(format!("{{{}: {}}}", quote(Operator::Literal.key()), quote(s)))
            }
            _ => args.push(source.to_string()),
          },
          // a lone operand of these is read as the source
          None if op.shape() == Shape::OptionalLambda && args.is_empty()
            && matches!(arg, Argument::Lambda(_)) => args.push(quote("$")),
          None => {}
        }
        match arg {
          Argument::None => {}
          Argument::Lambda(lambda) => args.push(lambda.body.to_string()),
          Argument::Operand(operand) => args.push(operand.to_string()),
        }
        write_operator(f, *op, &args)
      }
      NodeKind::Projection(fields) => {
        write!(f, "{{{}}}", fields.iter()
          .map(|field| format!("{}: {}", quote(&field.name), field.value))
          .join(", "))
      }
      NodeKind::Block(statements) => write!(f, "[{}]", statements.iter().join(", ")),
    }
  }
}

fn write_operator(f: &mut fmt::Formatter, op: Operator, args: &[String]) -> fmt::Result {
  write!(f, "{{{}: [{}]}}", quote(op.key()), args.join(", "))
}
