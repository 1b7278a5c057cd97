//! Semantic binding: resolves references against the shapes of the data,
//! assigns a static type to every node and checks operand types.

use std::fmt;
use std::sync::Arc;
use itertools::Itertools;
use regex::Regex;
use thiserror::Error;
use tracing::trace;
use crate::ast::{Argument, Node, NodeKind};
use crate::lex::Span;
use crate::operator::{Category, Operator};
use crate::token::Literal;
use crate::types::{FieldType, Member, RecordType, ShapeProvider, Type};

/// A syntax node with its static type.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
  pub kind: BoundKind,
  pub ty: Type,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundKind {
  Literal(Literal),
  /// The value of the scope at this depth. Depth 0 is the query source.
  Scope(usize),
  Member {
    target: Box<Bound>,
    member: Member,
  },
  Unary {
    op: Operator,
    operand: Box<Bound>,
  },
  Binary {
    op: Operator,
    left: Box<Bound>,
    right: Box<Bound>,
  },
  Query {
    op: Operator,
    source: Box<Bound>,
    arg: BoundArg,
  },
  Projection {
    record: Arc<RecordType>,
    fields: Vec<Bound>,
  },
  /// Every statement after the first runs in a scope holding the result of
  /// the one before it.
  Block(Vec<Bound>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundArg {
  None,
  /// The body runs in a new scope holding one element of the source.
  Lambda {
    param: Option<String>,
    body: Box<Bound>,
  },
  Operand(Box<Bound>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct BindingError {
  pub kind: BindingErrorKind,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingErrorKind {
  Unresolved {
    name: String,
    /// Innermost type the name was looked up in.
    searched: Type,
  },
  InvalidOperands {
    op: Operator,
    operands: Vec<Type>,
  },
  NotASequence {
    op: Operator,
    found: Type,
  },
  InvalidPattern {
    pattern: String,
    message: String,
  },
}

impl fmt::Display for BindingErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      BindingErrorKind::Unresolved { name, searched } => {
        write!(f, "cannot resolve `{}` in `{}`", name, searched)
      }
      BindingErrorKind::InvalidOperands { op, operands } => {
        write!(f, "`{}` cannot be applied to {}", op, operands.iter().join(" and "))
      }
      BindingErrorKind::NotASequence { op, found } => {
        write!(f, "`{}` needs a sequence, found `{}`", op, found)
      }
      BindingErrorKind::InvalidPattern { pattern, message } => {
        write!(f, "invalid pattern `{}`: {}", pattern, message)
      }
    }
  }
}

struct Scope {
  name: Option<String>,
  ty: Type,
}

pub struct Binder<'p> {
  shapes: &'p dyn ShapeProvider,
  scopes: Vec<Scope>,
}

/// Binds a query against a source of type `source`.
pub fn bind(node: &Node, source: &Type, shapes: &dyn ShapeProvider) -> Result<Bound, BindingError> {
  Binder::new(shapes, source.clone()).bind(node)
}

impl<'p> Binder<'p> {
  pub fn new(shapes: &'p dyn ShapeProvider, source: Type) -> Self {
    Binder {
      shapes,
      scopes: vec![Scope { name: None, ty: source }],
    }
  }

  pub fn bind(mut self, node: &Node) -> Result<Bound, BindingError> {
    self.node(node)
  }

  fn node(&mut self, node: &Node) -> Result<Bound, BindingError> {
    let span = node.span;

    let (kind, ty) = match &node.kind {
      NodeKind::Literal(literal) => {
        let ty = match literal {
          Literal::Null => Type::Null,
          Literal::Bool(_) => Type::Bool,
          Literal::Int(_) => Type::Int,
          Literal::Float(_) => Type::Float,
          Literal::String(_) => Type::String,
        };
        (BoundKind::Literal(literal.clone()), ty)
      }
      NodeKind::Reference(path) => return self.reference(path, span),
      NodeKind::Unary { op, operand } => {
        let operand = self.node(operand)?;
        let ty = match (op, &operand.ty) {
          (Operator::Negate, ty) if ty.is_numeric() => ty.clone(),
          (Operator::Not, Type::Bool) => Type::Bool,
          _ => return Err(invalid_operands(*op, &[&operand], span)),
        };
        (BoundKind::Unary { op: *op, operand: Box::new(operand) }, ty)
      }
      NodeKind::Binary { op, left, right } => {
        let left = self.node(left)?;
        let right = self.node(right)?;
        let ty = binary_type(*op, &left, &right, span)?;
        (BoundKind::Binary { op: *op, left: Box::new(left), right: Box::new(right) }, ty)
      }
      NodeKind::Query { op, source, arg } => {
        return self.query(*op, source.as_deref(), arg, span);
      }
      NodeKind::Projection(fields) => {
        let mut types = vec![];
        let mut values = vec![];
        for field in fields {
          let value = self.node(&field.value)?;
          types.push(FieldType::new(field.name.clone(), value.ty.clone()));
          values.push(value);
        }
        let record = Arc::new(RecordType::anonymous(types));
        let ty = Type::Record(Arc::clone(&record));
        (BoundKind::Projection { record, fields: values }, ty)
      }
      NodeKind::Block(statements) => {
        let depth = self.scopes.len();
        let bound = self.block(statements);
        self.scopes.truncate(depth);
        let bound = bound?;

        let ty = match bound.last() {
          Some(last) => last.ty.clone(),
          None => self.current().ty.clone(),
        };
        (BoundKind::Block(bound), ty)
      }
    };

    Ok(Bound { kind, ty, span })
  }

  fn block(&mut self, statements: &[Node]) -> Result<Vec<Bound>, BindingError> {
    let mut bound: Vec<Bound> = vec![];
    for statement in statements {
      if let Some(prev) = bound.last() {
        self.scopes.push(Scope { name: None, ty: prev.ty.clone() });
      }
      bound.push(self.node(statement)?);
    }
    Ok(bound)
  }

  fn current(&self) -> &Scope {
    &self.scopes[self.scopes.len() - 1]
  }

  fn reference(&self, path: &[String], span: Span) -> Result<Bound, BindingError> {
    let innermost = self.scopes.len() - 1;
    let scope = |depth: usize| Bound {
      kind: BoundKind::Scope(depth),
      ty: self.scopes[depth].ty.clone(),
      span,
    };

    let (first, rest) = match path.split_first() {
      Some(split) => split,
      None => return Ok(scope(innermost)),
    };

    for depth in (0..=innermost).rev() {
      let candidate = &self.scopes[depth];

      if candidate.name.as_deref().map_or(false, |name| name.eq_ignore_ascii_case(first)) {
        trace!(name = %first, depth, "parameter resolved");
        return self.members(scope(depth), rest);
      }

      if let Some(member) = self.member(&candidate.ty, first) {
        trace!(name = %first, depth, member = %member.name, "member resolved");
        let target = Bound {
          ty: member.ty.clone(),
          kind: BoundKind::Member { target: Box::new(scope(depth)), member },
          span,
        };
        return self.members(target, rest);
      }
    }

    Err(BindingError {
      kind: BindingErrorKind::Unresolved {
        name: first.clone(),
        searched: self.scopes[innermost].ty.clone(),
      },
      span,
    })
  }

  fn members(&self, mut target: Bound, path: &[String]) -> Result<Bound, BindingError> {
    let span = target.span;

    for name in path {
      let member = match self.member(&target.ty, name) {
        Some(member) => member,
        None => {
          return Err(BindingError {
            kind: BindingErrorKind::Unresolved { name: name.clone(), searched: target.ty },
            span,
          });
        }
      };
      target = Bound {
        ty: member.ty.clone(),
        kind: BoundKind::Member { target: Box::new(target), member },
        span,
      };
    }

    Ok(target)
  }

  fn member(&self, ty: &Type, name: &str) -> Option<Member> {
    let record = ty.as_record()?;
    self.shapes.describe(record)
      .into_iter()
      .find(|member| member.name.eq_ignore_ascii_case(name))
  }

  fn query(
    &mut self,
    op: Operator,
    source: Option<&Node>,
    arg: &Argument,
    span: Span,
  ) -> Result<Bound, BindingError> {
    let source = match source {
      Some(source) => self.node(source)?,
      None => self.reference(&[], span)?,
    };
    let element = match source.ty.element() {
      Some(element) => element.clone(),
      None => {
        return Err(BindingError {
          kind: BindingErrorKind::NotASequence { op, found: source.ty },
          span: source.span,
        });
      }
    };

    let (arg, ty) = match arg {
      Argument::None => {
        let ty = query_type(op, &source, &element, None, span)?;
        (BoundArg::None, ty)
      }
      Argument::Lambda(lambda) => {
        let param = lambda.param.as_ref().map(|decl| decl.name.clone());
        self.scopes.push(Scope { name: param.clone(), ty: element.clone() });
        let body = self.node(&lambda.body);
        self.scopes.pop();
        let body = body?;

        let ty = query_type(op, &source, &element, Some(&body), span)?;
        (BoundArg::Lambda { param, body: Box::new(body) }, ty)
      }
      Argument::Operand(operand) => {
        let operand = self.node(operand)?;
        if operand.ty != Type::Int {
          return Err(invalid_operands(op, &[&source, &operand], span));
        }
        let ty = match op {
          Operator::Index => element,
          _ => source.ty.clone(),
        };
        (BoundArg::Operand(Box::new(operand)), ty)
      }
    };

    Ok(Bound {
      kind: BoundKind::Query { op, source: Box::new(source), arg },
      ty,
      span,
    })
  }
}

fn invalid_operands(op: Operator, operands: &[&Bound], span: Span) -> BindingError {
  BindingError {
    kind: BindingErrorKind::InvalidOperands {
      op,
      operands: operands.iter().map(|b| b.ty.clone()).collect(),
    },
    span,
  }
}

fn binary_type(op: Operator, left: &Bound, right: &Bound, span: Span) -> Result<Type, BindingError> {
  let (l, r) = (&left.ty, &right.ty);

  let ty = match op.category() {
    Category::Arithmetic => l.numeric_result(r),
    Category::Relational => {
      let ok = match op {
        Operator::Equals | Operator::NotEquals => l.is_comparable_with(r),
        _ => (l.is_numeric() && r.is_numeric()) || (l == r && l.is_orderable()),
      };
      ok.then_some(Type::Bool)
    }
    Category::Logical => (*l == Type::Bool && *r == Type::Bool).then_some(Type::Bool),
    Category::PatternMatch => {
      if op == Operator::RegexMatch {
        if let BoundKind::Literal(Literal::String(pattern)) = &right.kind {
          if let Err(err) = Regex::new(pattern) {
            return Err(BindingError {
              kind: BindingErrorKind::InvalidPattern {
                pattern: pattern.clone(),
                message: err.to_string(),
              },
              span: right.span,
            });
          }
        }
      }
      (*l == Type::String && *r == Type::String).then_some(Type::Bool)
    }
    _ => None,
  };

  ty.ok_or_else(|| invalid_operands(op, &[left, right], span))
}

/// Result type of a collection operator applied to a sequence of
/// `element`, with the bound lambda body if there is one.
fn query_type(
  op: Operator,
  source: &Bound,
  element: &Type,
  body: Option<&Bound>,
  span: Span,
) -> Result<Type, BindingError> {
  use Operator::*;

  let selected = body.map_or(element, |body| &body.ty);

  let ty = match (op, body.map(|body| &body.ty)) {
    (Filter, Some(Type::Bool)) => Some(source.ty.clone()),
    (OrderBy | OrderByDescending, Some(key)) if key.is_orderable() => Some(source.ty.clone()),
    (Select | Project, Some(ty)) => Some(Type::seq(ty.clone())),
    (SelectMany, Some(Type::Seq(inner))) => Some(Type::seq((**inner).clone())),
    (Count, None | Some(Type::Bool)) => Some(Type::Int),
    (Any, None | Some(Type::Bool)) | (All, Some(Type::Bool)) => Some(Type::Bool),
    (Min | Max, _) if selected.is_orderable() => Some(selected.clone()),
    (Sum, _) if selected.is_numeric() => Some(selected.clone()),
    (Average, _) if selected.is_numeric() => Some(Type::Float),
    _ => None,
  };

  ty.ok_or_else(|| {
    let operands = match body {
      Some(body) => vec![source, body],
      None => vec![source],
    };
    invalid_operands(op, &operands, span)
  })
}
