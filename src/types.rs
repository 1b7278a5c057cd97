use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use thiserror::Error;

/// Static type of a query expression or of the data it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
  Null,
  Bool,
  Int,
  Float,
  String,
  Seq(Box<Type>),
  Record(Arc<RecordType>),
}

/// A record with ordered fields. Records built for projections have no
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
  name: Option<String>,
  fields: Vec<FieldType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
  pub name: String,
  pub ty: Type,
}

impl FieldType {
  pub fn new(name: impl Into<String>, ty: Type) -> Self {
    FieldType { name: name.into(), ty }
  }
}

impl RecordType {
  pub fn named(name: impl Into<String>, fields: Vec<FieldType>) -> Self {
    RecordType { name: Some(name.into()), fields }
  }

  pub fn anonymous(fields: Vec<FieldType>) -> Self {
    RecordType { name: None, fields }
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn fields(&self) -> &[FieldType] {
    &self.fields
  }

  /// Case-insensitive field lookup.
  pub fn field(&self, name: &str) -> Option<(usize, &FieldType)> {
    self.fields.iter()
      .enumerate()
      .find(|(_, field)| field.name.eq_ignore_ascii_case(name))
  }
}

impl fmt::Display for RecordType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match &self.name {
      Some(name) => f.write_str(name),
      None => write!(f, "{{{}}}", self.fields.iter()
        .map(|field| format!("{}: {}", field.name, field.ty))
        .join(", ")),
    }
  }
}

impl Type {
  pub fn seq(element: Type) -> Type {
    Type::Seq(Box::new(element))
  }

  pub fn record(record: RecordType) -> Type {
    Type::Record(Arc::new(record))
  }

  pub fn element(&self) -> Option<&Type> {
    match self {
      Type::Seq(element) => Some(element),
      _ => None,
    }
  }

  pub fn as_record(&self) -> Option<&Arc<RecordType>> {
    match self {
      Type::Record(record) => Some(record),
      _ => None,
    }
  }

  pub fn is_numeric(&self) -> bool {
    matches!(self, Type::Int | Type::Float)
  }

  /// Types with a total order usable by `$orderBy`, `$min` and `$max`.
  pub fn is_orderable(&self) -> bool {
    matches!(self, Type::Bool | Type::Int | Type::Float | Type::String)
  }

  /// Whether two values of these types may be tested for equality.
  pub fn is_comparable_with(&self, other: &Type) -> bool {
    self == other
      || (self.is_numeric() && other.is_numeric())
      || *self == Type::Null
      || *other == Type::Null
  }

  /// Result of an arithmetic operator: `int` for two ints, `float` when
  /// either side is a float.
  pub fn numeric_result(&self, other: &Type) -> Option<Type> {
    match (self, other) {
      (Type::Int, Type::Int) => Some(Type::Int),
      (a, b) if a.is_numeric() && b.is_numeric() => Some(Type::Float),
      _ => None,
    }
  }

  /// Reads a type from its JSON schema form: a primitive name, a
  /// one-element array for sequences, or `{"name": ..., "fields": {...}}`.
  pub fn from_schema(json: serde_json::Value) -> Result<Type, SchemaError> {
    let spec = TypeSpec::deserialize(json)?;
    spec.into_type()
  }

  pub fn load_schema(path: impl AsRef<Path>) -> Result<Type, SchemaError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
      .map_err(|source| SchemaError::Io {
        path: path.to_owned(),
        source,
      })?;
    Type::from_schema(serde_json::from_str(&text)?)
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Type::Null => f.write_str("null"),
      Type::Bool => f.write_str("bool"),
      Type::Int => f.write_str("int"),
      Type::Float => f.write_str("float"),
      Type::String => f.write_str("string"),
      Type::Seq(element) => write!(f, "[{}]", element),
      Type::Record(record) => fmt::Display::fmt(record, f),
    }
  }
}

#[derive(Debug, Error)]
pub enum SchemaError {
  #[error("cannot read schema file {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    source: io::Error,
  },
  #[error("invalid schema: {0}")]
  Json(#[from] serde_json::Error),
  #[error("unknown type `{0}`")]
  UnknownType(String),
  #[error("a sequence type lists exactly one element type, found {0}")]
  SeqArity(usize),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypeSpec {
  Name(String),
  Seq(Vec<TypeSpec>),
  Record(RecordSpec),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordSpec {
  name: String,
  fields: IndexMap<String, TypeSpec>,
}

impl TypeSpec {
  fn into_type(self) -> Result<Type, SchemaError> {
    Ok(match self {
      TypeSpec::Name(name) => match name.as_str() {
        "null" => Type::Null,
        "bool" => Type::Bool,
        "int" => Type::Int,
        "float" => Type::Float,
        "string" => Type::String,
        _ => return Err(SchemaError::UnknownType(name)),
      },
      TypeSpec::Seq(mut elements) => {
        if elements.len() != 1 {
          return Err(SchemaError::SeqArity(elements.len()));
        }
        Type::seq(elements.remove(0).into_type()?)
      }
      TypeSpec::Record(record) => {
        let fields = record.fields.into_iter()
          .map(|(name, spec)| Ok(FieldType::new(name, spec.into_type()?)))
          .collect::<Result<Vec<_>, SchemaError>>()?;
        Type::record(RecordType::named(record.name, fields))
      }
    })
  }
}

/// A member of a record that queries may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
  pub name: String,
  /// Position of the field in the record.
  pub index: usize,
  pub ty: Type,
}

/// Decides which members of a record type are visible to queries.
pub trait ShapeProvider {
  fn describe(&self, record: &RecordType) -> Vec<Member>;
}

/// Exposes every declared field.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredShapes;

impl ShapeProvider for DeclaredShapes {
  fn describe(&self, record: &RecordType) -> Vec<Member> {
    record.fields().iter()
      .enumerate()
      .map(|(index, field)| Member {
        name: field.name.clone(),
        index,
        ty: field.ty.clone(),
      })
      .collect()
  }
}

#[cfg(test)]
pub(crate) fn person() -> Type {
  Type::from_schema(serde_json::json!({
    "name": "Person",
    "fields": {
      "Name": "string",
      "Age": "int",
      "Score": "float",
      "Active": "bool",
      "Tags": ["string"],
      "Address": {
        "name": "Address",
        "fields": { "City": "string" }
      }
    }
  })).unwrap()
}
