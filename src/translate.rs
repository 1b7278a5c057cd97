//! Lowers a bound query to an executable expression tree.
//!
//! Every lambda gets a fresh parameter, and statements of a block are
//! inlined into the one that follows them. Collection operators become
//! method calls resolved through a [`CapabilityProvider`] for the
//! strategy the source supports.

use std::rc::Rc;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, trace};
use crate::bind::{Bound, BoundArg, BoundKind};
use crate::expr::{like_regex, BinaryOp, Expr, MatchKind, Method, MethodBinding, Param, Strategy, UnaryOp};
use crate::lex::Span;
use crate::operator::{Category, Operator};
use crate::query::CompiledQuery;
use crate::token::Literal;
use crate::types::Type;
use crate::value::Value;

/// Name of the parameter holding the query input.
pub const SOURCE_PARAM: &str = "source";

/// What the translator knows about the data a query will run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
  pub element: Type,
  /// Whether the source can run queries itself.
  pub queryable: bool,
}

impl SourceDescriptor {
  pub fn new(element: Type) -> Self {
    SourceDescriptor { element, queryable: false }
  }

  pub fn queryable(mut self) -> Self {
    self.queryable = true;
    self
  }

  pub fn ty(&self) -> Type {
    Type::seq(self.element.clone())
  }
}

/// Chooses how a source is queried and which methods exist for it.
pub trait CapabilityProvider {
  fn strategy(&self, source: &SourceDescriptor) -> Strategy;

  /// `None` when `method` is not available for `strategy`.
  fn bind(&self, strategy: Strategy, method: Method, element: &Type) -> Option<MethodBinding>;
}

/// Queryable sources get the queryable strategy, everything else is
/// enumerated. Every method is available for both.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCapabilities;

impl CapabilityProvider for DefaultCapabilities {
  fn strategy(&self, source: &SourceDescriptor) -> Strategy {
    if source.queryable {
      Strategy::Queryable
    } else {
      Strategy::Enumerable
    }
  }

  fn bind(&self, strategy: Strategy, method: Method, element: &Type) -> Option<MethodBinding> {
    Some(MethodBinding { strategy, method, element: element.clone() })
  }
}

/// A failure the binder should have ruled out, or a method the capability
/// provider does not offer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot translate{}: {message}", subject(.op, .operands))]
pub struct TranslationError {
  pub op: Option<Operator>,
  pub operands: Vec<Type>,
  pub message: String,
  pub span: Span,
}

fn subject(op: &Option<Operator>, operands: &[Type]) -> String {
  let mut subject = String::new();
  if let Some(op) = op {
    subject += &format!(" `{}`", op);
  }
  if !operands.is_empty() {
    subject += &format!(" on {}", operands.iter().join(" and "));
  }
  subject
}

/// The value every reference to one scope depth stands for.
struct Frame {
  parent: Option<Rc<Frame>>,
  depth: usize,
  value: Expr,
}

#[derive(Clone)]
struct Context(Rc<Frame>);

impl Context {
  fn root(value: Expr) -> Self {
    Context(Rc::new(Frame { parent: None, depth: 0, value }))
  }

  fn child(&self, value: Expr) -> Self {
    Context(Rc::new(Frame {
      parent: Some(Rc::clone(&self.0)),
      depth: self.0.depth + 1,
      value,
    }))
  }

  fn value(&self) -> &Expr {
    &self.0.value
  }

  fn lookup(&self, depth: usize) -> Option<&Expr> {
    let mut frame = &self.0;
    loop {
      if frame.depth == depth {
        return Some(&frame.value);
      }
      frame = frame.parent.as_ref()?;
    }
  }
}

pub struct Translator<'c> {
  capabilities: &'c dyn CapabilityProvider,
  strategy: Strategy,
  /// Parameter names of the enclosing lambdas.
  names: Vec<String>,
}

/// Translates a bound query into a query over `source`.
pub fn translate(
  bound: &Bound,
  source: &SourceDescriptor,
  capabilities: &dyn CapabilityProvider,
) -> Result<CompiledQuery, TranslationError> {
  let strategy = capabilities.strategy(source);
  let param = Param { name: SOURCE_PARAM.to_owned(), ty: source.ty() };
  let mut translator = Translator {
    capabilities,
    strategy,
    names: vec![param.name.clone()],
  };

  let context = Context::root(Expr::Parameter(param.clone()));
  let body = translator.expr(bound, &context)?;
  debug!(%strategy, query = %body, "translated");

  Ok(CompiledQuery::new(param, body, strategy))
}

impl<'c> Translator<'c> {
  /// `declared` if no enclosing lambda uses it, otherwise the first free
  /// one of `x`, `x1`, `x2`...
  fn fresh_name(&self, declared: Option<&str>) -> String {
    let taken = |name: &str| self.names.iter().any(|used| used == name);

    if let Some(name) = declared.filter(|name| !taken(name)) {
      return name.to_owned();
    }
    if !taken("x") {
      return "x".to_owned();
    }
    (1..)
      .map(|i| format!("x{}", i))
      .find(|name| !taken(name))
      .unwrap_or_default()
  }

  fn expr(&mut self, bound: &Bound, context: &Context) -> Result<Expr, TranslationError> {
    let ty = bound.ty.clone();

    Ok(match &bound.kind {
      BoundKind::Literal(literal) => Expr::Constant { value: Value::from(literal), ty },
      BoundKind::Scope(depth) => match context.lookup(*depth) {
        Some(value) => value.clone(),
        None => {
          return Err(TranslationError {
            op: None,
            operands: vec![ty],
            message: format!("scope {} is not in the context", depth),
            span: bound.span,
          });
        }
      },
      BoundKind::Member { target, member } => Expr::Member {
        target: Box::new(self.expr(target, context)?),
        member: member.clone(),
      },
      BoundKind::Unary { op, operand } => {
        let op = match op {
          Operator::Negate => UnaryOp::Negate,
          Operator::Not => UnaryOp::Not,
          op => return Err(unsupported(*op, &[&operand.ty], bound.span)),
        };
        Expr::Unary { op, operand: Box::new(self.expr(operand, context)?), ty }
      }
      BoundKind::Binary { op, left, right } => self.binary(*op, left, right, ty, bound.span, context)?,
      BoundKind::Query { op, source, arg } => self.query(*op, source, arg, ty, bound.span, context)?,
      BoundKind::Projection { record, fields } => Expr::New {
        record: record.clone(),
        fields: fields.iter()
          .map(|field| self.expr(field, context))
          .collect::<Result<_, _>>()?,
      },
      BoundKind::Block(statements) => {
        let mut context = context.clone();
        let mut last: Option<Expr> = None;
        for statement in statements {
          if let Some(prev) = last.take() {
            context = context.child(prev);
          }
          last = Some(self.expr(statement, &context)?);
        }
        match last {
          Some(last) => last,
          None => context.value().clone(),
        }
      }
    })
  }

  fn binary(
    &mut self,
    op: Operator,
    left: &Bound,
    right: &Bound,
    ty: Type,
    span: Span,
    context: &Context,
  ) -> Result<Expr, TranslationError> {
    let l = self.expr(left, context)?;
    let r = self.expr(right, context)?;

    if op.category() == Category::PatternMatch {
      let kind = MatchKind::for_operator(op)
        .ok_or_else(|| unsupported(op, &[&left.ty, &right.ty], span))?;
      let compiled = match (&right.kind, kind) {
        (BoundKind::Literal(Literal::String(pattern)), MatchKind::Like) => Some(like_regex(pattern)),
        (BoundKind::Literal(Literal::String(pattern)), MatchKind::Regex) => {
          Some(regex::Regex::new(pattern))
        }
        _ => None,
      };
      let compiled = compiled.transpose().map_err(|err| TranslationError {
        op: Some(op),
        operands: vec![left.ty.clone(), right.ty.clone()],
        message: err.to_string(),
        span,
      })?;
      return Ok(Expr::Match { kind, target: Box::new(l), pattern: Box::new(r), compiled });
    }

    let bin = BinaryOp::for_operator(op)
      .ok_or_else(|| unsupported(op, &[&left.ty, &right.ty], span))?;

    // mixed int and float operands meet at float
    let (l, r) = match (&left.ty, &right.ty) {
      (Type::Int, Type::Float) => (convert(l, Type::Float), r),
      (Type::Float, Type::Int) => (l, convert(r, Type::Float)),
      _ => (l, r),
    };

    Ok(Expr::Binary { op: bin, left: Box::new(l), right: Box::new(r), ty })
  }

  fn query(
    &mut self,
    op: Operator,
    source: &Bound,
    arg: &BoundArg,
    ty: Type,
    span: Span,
    context: &Context,
  ) -> Result<Expr, TranslationError> {
    let operands = |arg: &BoundArg| {
      let mut operands = vec![source.ty.clone()];
      match arg {
        BoundArg::None => {}
        BoundArg::Lambda { body, .. } => operands.push(body.ty.clone()),
        BoundArg::Operand(operand) => operands.push(operand.ty.clone()),
      }
      operands
    };

    let element = source.ty.element().cloned().ok_or_else(|| TranslationError {
      op: Some(op),
      operands: operands(arg),
      message: "the source is not a sequence".to_owned(),
      span,
    })?;
    let method = Method::for_operator(op).ok_or_else(|| TranslationError {
      op: Some(op),
      operands: operands(arg),
      message: "not a collection operator".to_owned(),
      span,
    })?;
    let binding = self.capabilities.bind(self.strategy, method, &element)
      .ok_or_else(|| TranslationError {
        op: Some(op),
        operands: operands(arg),
        message: format!("`{}` is not available for the {} strategy", method, self.strategy),
        span,
      })?;
    trace!(%binding, "method bound");

    let source = self.expr(source, context)?;
    let args = match arg {
      BoundArg::None => vec![],
      BoundArg::Lambda { param, body } => {
        let param = Param { name: self.fresh_name(param.as_deref()), ty: element };
        self.names.push(param.name.clone());
        let body = self.expr(body, &context.child(Expr::Parameter(param.clone())));
        self.names.pop();
        vec![Expr::Lambda { param, body: Box::new(body?) }]
      }
      BoundArg::Operand(operand) => vec![self.expr(operand, context)?],
    };

    Ok(Expr::Call { binding, source: Box::new(source), args, ty })
  }
}

fn convert(expr: Expr, ty: Type) -> Expr {
  Expr::Convert { operand: Box::new(expr), ty }
}

fn unsupported(op: Operator, operands: &[&Type], span: Span) -> TranslationError {
  TranslationError {
    op: Some(op),
    operands: operands.iter().map(|&ty| ty.clone()).collect(),
    message: "no expression form for this operator".to_owned(),
    span,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bind::bind;
  use crate::types::{person, DeclaredShapes};
  use crate::Compiler;
  use pretty_assertions::assert_eq;

  fn translate_with(text: &str, capabilities: &dyn CapabilityProvider) -> Result<CompiledQuery, TranslationError> {
    let node = Compiler::default().parse(text).unwrap();
    let source = SourceDescriptor::new(person());
    let bound = bind(&node, &source.ty(), &DeclaredShapes).unwrap();
    translate(&bound, &source, capabilities)
  }

  fn render(text: &str) -> String {
    translate_with(text, &DefaultCapabilities).unwrap().to_string()
  }

  #[test]
  fn filter() {
    assert_eq!(
      render(r#"{"$filter": ["x", {"$greater": ["$age", 18]}]}"#),
      "source.Where(x => (x.Age > 18))",
    );
    assert_eq!(
      render(r#"{"$filter": ["p", {"$greater": ["$p.age", 18]}]}"#),
      "source.Where(p => (p.Age > 18))",
    );
  }

  #[test]
  fn projection() {
    assert_eq!(
      render(r#"{"$project": [{"adultName": "$name", "next": {"$add": ["$age", 1]}}]}"#),
      "source.Select(x => new {adultName = x.Name, next = (x.Age + 1)})",
    );
  }

  #[test]
  fn nested_lambdas_get_distinct_names() {
    assert_eq!(
      render(r#"{"$filter": {"$any": ["$tags", {"$equals": ["$", "$name"]}]}}"#),
      "source.Where(x => x.Tags.Any(x1 => (x1 == x.Name)))",
    );
    // a declared name that would shadow an enclosing one is renamed
    assert_eq!(
      render(r#"{"$filter": ["x", {"$any": ["x", "$x.tags", {"$equals": ["$x", "a"]}]}]}"#),
      "source.Where(x => x.Tags.Any(x1 => (x1 == \"a\")))",
    );
  }

  #[test]
  fn numeric_conversions() {
    assert_eq!(
      render(r#"{"$select": {"$multiply": ["$age", "$score"]}}"#),
      "source.Select(x => (Convert(x.Age, float) * x.Score))",
    );
    assert_eq!(
      render(r#"{"$filter": {"$less": ["$score", 2]}}"#),
      "source.Where(x => (x.Score < Convert(2, float)))",
    );
  }

  #[test]
  fn blocks_inline_previous_statements() {
    assert_eq!(
      render(r#"[{"$filter": {"$greater": ["$age", 18]}}, {"$select": "$name"}, {"$count": []}]"#),
      "source.Where(x => (x.Age > 18)).Select(x => x.Name).Count()",
    );
    assert_eq!(render("[]"), "source");
  }

  #[test]
  fn counted_and_patterns() {
    assert_eq!(
      render(r#"[{"$orderByDescending": "$score"}, {"$limit": 2}]"#),
      "source.OrderByDescending(x => x.Score).Take(2)",
    );
    assert_eq!(
      render(r#"{"$filter": {"$like": ["$name", "A%"]}}"#),
      "source.Where(x => Like(x.Name, \"A%\"))",
    );
    assert_eq!(
      render(r#"{"$filter": {"$not": {"$startsWith": ["$address.city", "Ber"]}}}"#),
      "source.Where(x => !x.Address.City.StartsWith(\"Ber\"))",
    );
  }

  #[test]
  fn strategies() {
    let node = Compiler::default().parse(r#"{"$count": []}"#).unwrap();
    let source = SourceDescriptor::new(person()).queryable();
    let bound = bind(&node, &source.ty(), &DeclaredShapes).unwrap();

    let query = translate(&bound, &source, &DefaultCapabilities).unwrap();
    assert_eq!(query.strategy(), Strategy::Queryable);
    assert_eq!(query.output_type(), Type::Int);
  }

  struct NoOrdering;

  impl CapabilityProvider for NoOrdering {
    fn strategy(&self, _: &SourceDescriptor) -> Strategy {
      Strategy::Queryable
    }

    fn bind(&self, strategy: Strategy, method: Method, element: &Type) -> Option<MethodBinding> {
      match method {
        Method::OrderBy | Method::OrderByDescending => None,
        _ => DefaultCapabilities.bind(strategy, method, element),
      }
    }
  }

  #[test]
  fn missing_method_binding() {
    assert!(translate_with(r#"{"$limit": 1}"#, &NoOrdering).is_ok());

    let err = translate_with(r#"{"$orderBy": "$age"}"#, &NoOrdering).unwrap_err();
    assert_eq!(err.op, Some(Operator::OrderBy));
    assert_eq!(err.operands, vec![Type::seq(person()), Type::Int]);
    assert_eq!(
      err.to_string(),
      "cannot translate `$orderBy` on [Person] and int: `OrderBy` is not available for the queryable strategy",
    );
  }

  #[test]
  fn error_messages() {
    let err = TranslationError {
      op: None,
      operands: vec![],
      message: "scope 2 is not in the context".to_owned(),
      span: Span::new(0, 4),
    };
    assert_eq!(err.to_string(), "cannot translate: scope 2 is not in the context");

    let err: &dyn std::error::Error = &err;
    assert!(err.source().is_none());
  }
}
