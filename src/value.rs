use std::cmp::Ordering;
use std::fmt;
use itertools::Itertools;
use serde_json::{Map as JsonMap, Number};
use crate::eval::ExecutionError;
use crate::token::{quote, Literal};
use crate::types::Type;

/// A runtime value. Records hold their fields in declaration order; the
/// names live in the record's type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  List(Vec<Value>),
  Record(Vec<Value>),
}

impl From<&Literal> for Value {
  fn from(literal: &Literal) -> Self {
    match literal {
      Literal::Null => Value::Null,
      Literal::Bool(b) => Value::Bool(*b),
      Literal::Int(n) => Value::Int(*n),
      Literal::Float(x) => Value::Float(*x),
      Literal::String(s) => Value::String(s.clone()),
    }
  }
}

impl Value {
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::String(_) => "string",
      Value::List(_) => "sequence",
      Value::Record(_) => "record",
    }
  }

  /// Reads JSON data as a value of type `ty`. Any value may be null, and
  /// record fields missing from an object read as null.
  pub fn from_json(json: &serde_json::Value, ty: &Type) -> Result<Value, ExecutionError> {
    use serde_json::Value as Json;

    let mismatch = || ExecutionError::TypeMismatch {
      expected: ty.to_string(),
      found: json_kind(json).to_owned(),
    };

    Ok(match (ty, json) {
      (_, Json::Null) => Value::Null,
      (Type::Bool, Json::Bool(b)) => Value::Bool(*b),
      (Type::Int, Json::Number(n)) => Value::Int(n.as_i64().ok_or_else(mismatch)?),
      (Type::Float, Json::Number(n)) => Value::Float(n.as_f64().ok_or_else(mismatch)?),
      (Type::String, Json::String(s)) => Value::String(s.clone()),
      (Type::Seq(element), Json::Array(items)) => Value::List(
        items.iter()
          .map(|item| Value::from_json(item, element))
          .collect::<Result<_, _>>()?,
      ),
      (Type::Record(record), Json::Object(object)) => Value::Record(
        record.fields().iter()
          .map(|field| {
            let value = object.iter()
              .find(|(key, _)| key.eq_ignore_ascii_case(&field.name))
              .map(|(_, value)| value);
            match value {
              Some(value) => Value::from_json(value, &field.ty),
              None => Ok(Value::Null),
            }
          })
          .collect::<Result<_, _>>()?,
      ),
      _ => return Err(mismatch()),
    })
  }

  /// Writes the value as JSON, taking record field names from `ty`.
  pub fn to_json(&self, ty: &Type) -> serde_json::Value {
    use serde_json::Value as Json;

    match (self, ty) {
      (Value::Null, _) => Json::Null,
      (Value::Bool(b), _) => Json::Bool(*b),
      (Value::Int(n), _) => Json::from(*n),
      (Value::Float(x), _) => Number::from_f64(*x).map_or(Json::Null, Json::Number),
      (Value::String(s), _) => Json::String(s.clone()),
      (Value::List(items), ty) => {
        let element = ty.element().cloned().unwrap_or(Type::Null);
        Json::Array(items.iter().map(|item| item.to_json(&element)).collect())
      }
      (Value::Record(values), Type::Record(record)) => {
        let mut object = JsonMap::new();
        for (field, value) in record.fields().iter().zip(values) {
          object.insert(field.name.clone(), value.to_json(&field.ty));
        }
        Json::Object(object)
      }
      (Value::Record(values), _) => {
        Json::Array(values.iter().map(|value| value.to_json(&Type::Null)).collect())
      }
    }
  }

  pub fn as_bool(&self) -> Result<bool, ExecutionError> {
    match self {
      Value::Bool(b) => Ok(*b),
      other => Err(ExecutionError::mismatch("bool", other)),
    }
  }

  pub fn as_int(&self) -> Result<i64, ExecutionError> {
    match self {
      Value::Int(n) => Ok(*n),
      other => Err(ExecutionError::mismatch("int", other)),
    }
  }

  pub fn as_float(&self) -> Result<f64, ExecutionError> {
    match self {
      Value::Int(n) => Ok(*n as f64),
      Value::Float(x) => Ok(*x),
      other => Err(ExecutionError::mismatch("float", other)),
    }
  }

  /// The items of a sequence. Null reads as an empty sequence.
  pub fn into_list(self) -> Result<Vec<Value>, ExecutionError> {
    match self {
      Value::List(items) => Ok(items),
      Value::Null => Ok(vec![]),
      other => Err(ExecutionError::mismatch("sequence", &other)),
    }
  }

  /// Equality with ints and floats compared by value.
  pub fn equals(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
      (Value::List(a), Value::List(b)) | (Value::Record(a), Value::Record(b)) => {
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.equals(b))
      }
      (a, b) => a == b,
    }
  }

  /// Ordering of two primitive values. `None` when either is null or the
  /// kinds differ.
  pub fn compare(&self, other: &Value) -> Option<Ordering> {
    match (self, other) {
      (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
      (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
      (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
      (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
      (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
      (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
      _ => None,
    }
  }

  /// Ordering used for sorting, with nulls first.
  pub fn sort_order(&self, other: &Value) -> Ordering {
    match (self, other) {
      (Value::Null, Value::Null) => Ordering::Equal,
      (Value::Null, _) => Ordering::Less,
      (_, Value::Null) => Ordering::Greater,
      (a, b) => a.compare(b).unwrap_or(Ordering::Equal),
    }
  }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
  use serde_json::Value as Json;

  match json {
    Json::Null => "null",
    Json::Bool(_) => "bool",
    Json::Number(n) if n.is_i64() => "int",
    Json::Number(_) => "float",
    Json::String(_) => "string",
    Json::Array(_) => "array",
    Json::Object(_) => "object",
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Value::Null => f.write_str("null"),
      Value::Bool(b) => write!(f, "{}", b),
      Value::Int(n) => write!(f, "{}", n),
      Value::Float(x) => write!(f, "{:?}", x),
      Value::String(s) => f.write_str(&quote(s)),
      Value::List(items) => write!(f, "[{}]", items.iter().join(", ")),
      Value::Record(fields) => write!(f, "{{{}}}", fields.iter().join(", ")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::person;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  #[test]
  fn records_from_json() {
    let value = Value::from_json(
      &json!({"name": "Ann", "AGE": 30, "score": 1, "tags": ["a"], "address": null}),
      &person(),
    ).unwrap();

    assert_eq!(value, Value::Record(vec![
      Value::String("Ann".to_owned()),
      Value::Int(30),
      Value::Float(1.0),
      Value::Null,
      Value::List(vec![Value::String("a".to_owned())]),
      Value::Null,
    ]));
    assert_eq!(value.to_string(), r#"{"Ann", 30, 1.0, null, ["a"], null}"#);
  }

  #[test]
  fn records_to_json() {
    let value = Value::from_json(&json!({"name": "Ann", "age": 30}), &person()).unwrap();

    assert_eq!(value.to_json(&person()), json!({
      "Name": "Ann",
      "Age": 30,
      "Score": null,
      "Active": null,
      "Tags": null,
      "Address": null,
    }));
  }

  #[test]
  fn type_mismatches() {
    let err = Value::from_json(&json!({"age": "old"}), &person()).unwrap_err();
    assert_eq!(err.to_string(), "expected int, found string");

    let err = Value::from_json(&json!(1.5), &Type::Int).unwrap_err();
    assert_eq!(err.to_string(), "expected int, found float");
  }

  #[test]
  fn comparisons() {
    assert!(Value::Int(2).equals(&Value::Float(2.0)));
    assert!(!Value::Int(2).equals(&Value::Null));
    assert!(Value::Null.equals(&Value::Null));
    assert_eq!(Value::Int(1).compare(&Value::Float(1.5)), Some(Ordering::Less));
    assert_eq!(Value::Null.compare(&Value::Int(1)), None);
    assert_eq!(Value::String("b".to_owned()).compare(&Value::String("a".to_owned())), Some(Ordering::Greater));
    assert_eq!(Value::Null.sort_order(&Value::Int(1)), Ordering::Less);
  }
}
