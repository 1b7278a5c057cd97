//! In-memory evaluation of compiled queries.

use std::cmp::Ordering;
use regex::Regex;
use thiserror::Error;
use crate::expr::{like_regex, BinaryOp, Expr, MatchKind, Method, UnaryOp};
use crate::types::Type;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
  #[error("division by zero")]
  DivisionByZero,
  #[error("arithmetic overflow in `{0}`")]
  Overflow(&'static str),
  #[error("index {index} is out of range for a sequence of {len} elements")]
  IndexOutOfRange {
    index: i64,
    len: usize,
  },
  #[error("`{0}` of an empty sequence")]
  EmptySequence(&'static str),
  #[error("expected {expected}, found {found}")]
  TypeMismatch {
    expected: String,
    found: String,
  },
  #[error("unbound parameter `{0}`")]
  UnboundParameter(String),
  #[error("invalid pattern `{pattern}`: {message}")]
  InvalidPattern {
    pattern: String,
    message: String,
  },
}

impl ExecutionError {
  pub(crate) fn mismatch(expected: &str, found: &Value) -> Self {
    ExecutionError::TypeMismatch {
      expected: expected.to_owned(),
      found: found.kind().to_owned(),
    }
  }
}

/// Parameter bindings, innermost last.
#[derive(Debug, Default)]
pub struct Env {
  bindings: Vec<(String, Value)>,
}

impl Env {
  pub fn new() -> Self {
    Env::default()
  }

  pub fn push(&mut self, name: impl Into<String>, value: Value) {
    self.bindings.push((name.into(), value));
  }

  pub fn pop(&mut self) {
    self.bindings.pop();
  }

  pub fn lookup(&self, name: &str) -> Option<&Value> {
    self.bindings.iter()
      .rev()
      .find(|(bound, _)| bound == name)
      .map(|(_, value)| value)
  }
}

pub fn eval(expr: &Expr, env: &mut Env) -> Result<Value, ExecutionError> {
  match expr {
    Expr::Constant { value, .. } => Ok(value.clone()),
    Expr::Parameter(param) => env.lookup(&param.name)
      .cloned()
      .ok_or_else(|| ExecutionError::UnboundParameter(param.name.clone())),
    Expr::Member { target, member } => match eval(target, env)? {
      Value::Record(fields) => Ok(fields.into_iter().nth(member.index).unwrap_or(Value::Null)),
      Value::Null => Ok(Value::Null),
      other => Err(ExecutionError::mismatch("record", &other)),
    },
    Expr::Unary { op, operand, .. } => {
      let value = eval(operand, env)?;
      match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Negate, Value::Int(n)) => {
          n.checked_neg().map(Value::Int).ok_or(ExecutionError::Overflow("-"))
        }
        (UnaryOp::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Negate, other) => Err(ExecutionError::mismatch("number", &other)),
        (UnaryOp::Not, other) => Ok(Value::Bool(!other.as_bool()?)),
      }
    }
    Expr::Binary { op: BinaryOp::AndAlso, left, right, .. } => {
      Ok(Value::Bool(truthy(eval(left, env)?)? && truthy(eval(right, env)?)?))
    }
    Expr::Binary { op: BinaryOp::OrElse, left, right, .. } => {
      Ok(Value::Bool(truthy(eval(left, env)?)? || truthy(eval(right, env)?)?))
    }
    Expr::Binary { op, left, right, .. } => {
      let left = eval(left, env)?;
      let right = eval(right, env)?;
      binary(*op, left, right)
    }
    Expr::Convert { operand, ty } => match (eval(operand, env)?, ty) {
      (Value::Null, _) => Ok(Value::Null),
      (value, Type::Float) => value.as_float().map(Value::Float),
      (value, _) => Ok(value),
    },
    Expr::Match { kind, target, pattern, compiled } => {
      let target = eval(target, env)?;
      let pattern = eval(pattern, env)?;
      pattern_match(*kind, target, pattern, compiled.as_ref())
    }
    Expr::Call { binding, source, args, ty } => {
      let items = eval(source, env)?.into_list()?;
      call(binding.method, items, args.first(), ty, env)
    }
    Expr::Lambda { .. } => Err(ExecutionError::TypeMismatch {
      expected: "value".to_owned(),
      found: "lambda".to_owned(),
    }),
    Expr::New { fields, .. } => Ok(Value::Record(
      fields.iter()
        .map(|field| eval(field, env))
        .collect::<Result<_, _>>()?,
    )),
    Expr::Invoke { lambda, arg } => {
      let arg = eval(arg, env)?;
      apply(lambda, arg, env)
    }
  }
}

/// Null counts as false in conditions.
fn truthy(value: Value) -> Result<bool, ExecutionError> {
  match value {
    Value::Null => Ok(false),
    value => value.as_bool(),
  }
}

fn apply(lambda: &Expr, arg: Value, env: &mut Env) -> Result<Value, ExecutionError> {
  match lambda {
    Expr::Lambda { param, body } => {
      env.push(param.name.clone(), arg);
      let result = eval(body, env);
      env.pop();
      result
    }
    other => Err(ExecutionError::TypeMismatch {
      expected: "lambda".to_owned(),
      found: other.ty().to_string(),
    }),
  }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExecutionError> {
  let test: fn(Ordering) -> bool = match op {
    BinaryOp::Equal => return Ok(Value::Bool(left.equals(&right))),
    BinaryOp::NotEqual => return Ok(Value::Bool(!left.equals(&right))),
    BinaryOp::Less => Ordering::is_lt,
    BinaryOp::LessEqual => Ordering::is_le,
    BinaryOp::Greater => Ordering::is_gt,
    BinaryOp::GreaterEqual => Ordering::is_ge,
    _ => return arithmetic(op, left, right),
  };
  Ok(Value::Bool(left.compare(&right).map_or(false, test)))
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExecutionError> {
  let symbol = op.symbol();

  match (left, right) {
    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
    (Value::Int(a), Value::Int(b)) => {
      let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide | BinaryOp::Modulo if b == 0 => {
          return Err(ExecutionError::DivisionByZero);
        }
        BinaryOp::Divide => a.checked_div(b),
        BinaryOp::Modulo => a.checked_rem(b),
        _ => unreachable!("`{}` is not arithmetic", symbol),
      };
      result.map(Value::Int).ok_or(ExecutionError::Overflow(symbol))
    }
    (left, right) => {
      let (a, b) = (left.as_float()?, right.as_float()?);
      let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide | BinaryOp::Modulo if b == 0.0 => {
          return Err(ExecutionError::DivisionByZero);
        }
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        _ => unreachable!("`{}` is not arithmetic", symbol),
      };
      if result.is_finite() {
        Ok(Value::Float(result))
      } else {
        Err(ExecutionError::Overflow(symbol))
      }
    }
  }
}

fn pattern_match(
  kind: MatchKind,
  target: Value,
  pattern: Value,
  compiled: Option<&Regex>,
) -> Result<Value, ExecutionError> {
  let (target, pattern) = match (target, pattern) {
    (Value::String(target), Value::String(pattern)) => (target, pattern),
    (Value::Null, _) | (_, Value::Null) => return Ok(Value::Bool(false)),
    (Value::String(_), other) | (other, _) => {
      return Err(ExecutionError::mismatch("string", &other));
    }
  };

  let matched = match kind {
    MatchKind::Contains => target.contains(pattern.as_str()),
    MatchKind::StartsWith => target.starts_with(pattern.as_str()),
    MatchKind::EndsWith => target.ends_with(pattern.as_str()),
    MatchKind::Like | MatchKind::Regex => {
      let owned;
      let regex = match compiled {
        Some(regex) => regex,
        None => {
          let built = match kind {
            MatchKind::Like => like_regex(&pattern),
            _ => Regex::new(&pattern),
          };
          owned = built.map_err(|err| ExecutionError::InvalidPattern {
            pattern: pattern.clone(),
            message: err.to_string(),
          })?;
          &owned
        }
      };
      regex.is_match(&target)
    }
  };
  Ok(Value::Bool(matched))
}

fn call(
  method: Method,
  items: Vec<Value>,
  arg: Option<&Expr>,
  ty: &Type,
  env: &mut Env,
) -> Result<Value, ExecutionError> {
  // the lambda, if any, applied to every item
  let map = |items: Vec<Value>, env: &mut Env| -> Result<Vec<Value>, ExecutionError> {
    match arg {
      Some(lambda @ Expr::Lambda { .. }) => {
        items.into_iter().map(|item| apply(lambda, item, env)).collect()
      }
      _ => Ok(items),
    }
  };
  let count = |env: &mut Env| -> Result<i64, ExecutionError> {
    match arg {
      Some(operand) => eval(operand, env)?.as_int(),
      None => Ok(0),
    }
  };

  Ok(match method {
    Method::Where => {
      let keys = map(items.clone(), env)?;
      let mut kept = vec![];
      for (item, key) in items.into_iter().zip(keys) {
        if truthy(key)? {
          kept.push(item);
        }
      }
      Value::List(kept)
    }
    Method::Select => Value::List(map(items, env)?),
    Method::SelectMany => {
      let mut flat = vec![];
      for inner in map(items, env)? {
        flat.extend(inner.into_list()?);
      }
      Value::List(flat)
    }
    Method::OrderBy | Method::OrderByDescending => {
      let keys = map(items.clone(), env)?;
      let mut keyed = items.into_iter().zip(keys).collect::<Vec<_>>();
      keyed.sort_by(|(_, a), (_, b)| match method {
        Method::OrderBy => a.sort_order(b),
        _ => b.sort_order(a),
      });
      Value::List(keyed.into_iter().map(|(item, _)| item).collect())
    }
    Method::Take => {
      let n = count(env)?.max(0) as usize;
      Value::List(items.into_iter().take(n).collect())
    }
    Method::Skip => {
      let n = count(env)?.max(0) as usize;
      Value::List(items.into_iter().skip(n).collect())
    }
    Method::ElementAt => {
      let index = count(env)?;
      let len = items.len();
      match usize::try_from(index).ok().filter(|&i| i < len) {
        Some(i) => items.into_iter().nth(i).unwrap_or(Value::Null),
        None => return Err(ExecutionError::IndexOutOfRange { index, len }),
      }
    }
    Method::Count => match arg {
      Some(_) => {
        let mut n = 0;
        for key in map(items, env)? {
          if truthy(key)? {
            n += 1;
          }
        }
        Value::Int(n)
      }
      None => Value::Int(items.len() as i64),
    },
    Method::Any => match arg {
      Some(_) => {
        let mut found = false;
        for key in map(items, env)? {
          if truthy(key)? {
            found = true;
            break;
          }
        }
        Value::Bool(found)
      }
      None => Value::Bool(!items.is_empty()),
    },
    Method::All => {
      let mut all = true;
      for key in map(items, env)? {
        if !truthy(key)? {
          all = false;
          break;
        }
      }
      Value::Bool(all)
    }
    Method::Min | Method::Max => {
      let best = map(items, env)?
        .into_iter()
        .filter(|value| *value != Value::Null)
        .reduce(|best, value| {
          let ord = value.sort_order(&best);
          match (method, ord) {
            (Method::Min, Ordering::Less) | (Method::Max, Ordering::Greater) => value,
            _ => best,
          }
        });
      best.ok_or(ExecutionError::EmptySequence(method.name()))?
    }
    Method::Sum => {
      let values = map(items, env)?;
      match ty {
        Type::Int => {
          let mut sum = 0i64;
          for value in values.iter().filter(|value| **value != Value::Null) {
            sum = sum.checked_add(value.as_int()?).ok_or(ExecutionError::Overflow("Sum"))?;
          }
          Value::Int(sum)
        }
        _ => {
          let mut sum = 0.0;
          for value in values.iter().filter(|value| **value != Value::Null) {
            sum += value.as_float()?;
          }
          Value::Float(sum)
        }
      }
    }
    Method::Average => {
      let values = map(items, env)?
        .into_iter()
        .filter(|value| *value != Value::Null)
        .collect::<Vec<_>>();
      if values.is_empty() {
        return Err(ExecutionError::EmptySequence(method.name()));
      }
      let mut sum = 0.0;
      for value in &values {
        sum += value.as_float()?;
      }
      Value::Float(sum / values.len() as f64)
    }
  })
}
