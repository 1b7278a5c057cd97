use std::fmt;
use tracing::debug;
use crate::eval::{eval, Env, ExecutionError};
use crate::expr::{Expr, Param, Strategy};
use crate::translate::{SourceDescriptor, TranslationError};
use crate::types::Type;
use crate::value::Value;

/// Data a compiled query runs on.
pub trait QuerySource {
  fn descriptor(&self) -> SourceDescriptor;

  fn rows(&self) -> Result<Vec<Value>, ExecutionError>;

  /// Runs the query natively. Sources that return `None` are evaluated in
  /// memory over [`QuerySource::rows`].
  fn execute_queryable(&self, _query: &CompiledQuery) -> Option<Result<Value, ExecutionError>> {
    None
  }
}

/// Rows held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
  descriptor: SourceDescriptor,
  rows: Vec<Value>,
}

impl InMemorySource {
  pub fn new(element: Type, rows: Vec<Value>) -> Self {
    InMemorySource { descriptor: SourceDescriptor::new(element), rows }
  }

  /// Reads rows from a JSON array of `element` values.
  pub fn from_json(element: Type, json: &serde_json::Value) -> Result<Self, ExecutionError> {
    let rows = Value::from_json(json, &Type::seq(element.clone()))?.into_list()?;
    Ok(InMemorySource::new(element, rows))
  }

  /// Marks the source as queryable. It still evaluates queries in memory.
  pub fn queryable(mut self) -> Self {
    self.descriptor = self.descriptor.queryable();
    self
  }
}

impl QuerySource for InMemorySource {
  fn descriptor(&self) -> SourceDescriptor {
    self.descriptor.clone()
  }

  fn rows(&self) -> Result<Vec<Value>, ExecutionError> {
    Ok(self.rows.clone())
  }
}

/// A translated query: a function of one parameter, the source sequence.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
  param: Param,
  body: Expr,
  strategy: Strategy,
}

impl CompiledQuery {
  pub(crate) fn new(param: Param, body: Expr, strategy: Strategy) -> Self {
    CompiledQuery { param, body, strategy }
  }

  pub fn parameter(&self) -> &Param {
    &self.param
  }

  pub fn expression(&self) -> &Expr {
    &self.body
  }

  pub fn strategy(&self) -> Strategy {
    self.strategy
  }

  pub fn input_type(&self) -> &Type {
    &self.param.ty
  }

  pub fn output_type(&self) -> Type {
    self.body.ty()
  }

  pub fn execute(&self, source: &dyn QuerySource) -> Result<Value, ExecutionError> {
    let input = source.descriptor().ty();
    if input != self.param.ty {
      return Err(ExecutionError::TypeMismatch {
        expected: self.param.ty.to_string(),
        found: input.to_string(),
      });
    }

    if self.strategy == Strategy::Queryable {
      if let Some(result) = source.execute_queryable(self) {
        return result;
      }
      debug!("source cannot run the query, evaluating in memory");
    }

    let mut env = Env::new();
    env.push(self.param.name.clone(), Value::List(source.rows()?));
    eval(&self.body, &mut env)
  }

  /// Composes two queries: `next` runs on the result of this one.
  pub fn then(&self, next: &CompiledQuery) -> Result<CompiledQuery, TranslationError> {
    let output = self.output_type();
    if output != next.param.ty {
      return Err(TranslationError {
        op: None,
        operands: vec![output, next.param.ty.clone()],
        message: "the first query's result does not fit the second's input".to_owned(),
        span: Default::default(),
      });
    }

    let body = Expr::Invoke {
      lambda: Box::new(Expr::Lambda {
        param: next.param.clone(),
        body: Box::new(next.body.clone()),
      }),
      arg: Box::new(self.body.clone()),
    };
    Ok(CompiledQuery::new(self.param.clone(), body, self.strategy))
  }
}

impl fmt::Display for CompiledQuery {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    fmt::Display::fmt(&self.body, f)
  }
}
