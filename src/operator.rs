use std::fmt;
use once_cell::sync::Lazy;
use crate::Map;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
  Add,
  Subtract,
  Multiply,
  Divide,
  Modulo,
  Negate,

  Equals,
  NotEquals,
  Less,
  LessEquals,
  Greater,
  GreaterEquals,

  And,
  Or,
  Not,

  Like,
  Contains,
  StartsWith,
  EndsWith,
  RegexMatch,

  Filter,
  Select,
  Project,
  SelectMany,
  OrderBy,
  OrderByDescending,
  Limit,
  Skip,

  Count,
  Any,
  All,
  Min,
  Max,
  Sum,
  Average,
  Index,

  Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
  Arithmetic,
  Relational,
  Logical,
  PatternMatch,
  CollectionManipulation,
  CollectionAggregation,
  Literal,
}

/// How an operator's arguments are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
  Unary,
  Binary,
  /// `[decl?, source?, body]`, the body is required.
  Lambda,
  /// `[]`, `[source]`, `[decl?, source, body]`.
  OptionalLambda,
  /// `[count]` or `[source, count]`.
  Counted,
  /// A single operand taken verbatim.
  Literal,
}

static OPERATORS: Lazy<Map<&'static str, Operator>> = Lazy::new(|| {
  let mut map = Map::default();
  for op in Operator::ALL {
    if map.insert(op.key(), op).is_some() {
      panic!("operator key {} is defined twice", op.key());
    }
  }
  map
});

impl Operator {
  pub const ALL: [Operator; 37] = [
    Operator::Add,
    Operator::Subtract,
    Operator::Multiply,
    Operator::Divide,
    Operator::Modulo,
    Operator::Negate,
    Operator::Equals,
    Operator::NotEquals,
    Operator::Less,
    Operator::LessEquals,
    Operator::Greater,
    Operator::GreaterEquals,
    Operator::And,
    Operator::Or,
    Operator::Not,
    Operator::Like,
    Operator::Contains,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::RegexMatch,
    Operator::Filter,
    Operator::Select,
    Operator::Project,
    Operator::SelectMany,
    Operator::OrderBy,
    Operator::OrderByDescending,
    Operator::Limit,
    Operator::Skip,
    Operator::Count,
    Operator::Any,
    Operator::All,
    Operator::Min,
    Operator::Max,
    Operator::Sum,
    Operator::Average,
    Operator::Index,
    Operator::Literal,
  ];

  /// Looks up an operator by its `$`-prefixed key. Keys are case sensitive.
  pub fn from_key(key: &str) -> Option<Operator> {
    OPERATORS.get(key).copied()
  }

  pub fn key(self) -> &'static str {
    match self {
      Operator::Add => "$add",
      Operator::Subtract => "$subtract",
      Operator::Multiply => "$multiply",
      Operator::Divide => "$divide",
      Operator::Modulo => "$modulo",
      Operator::Negate => "$negate",
      Operator::Equals => "$equals",
      Operator::NotEquals => "$notEquals",
      Operator::Less => "$less",
      Operator::LessEquals => "$lessEquals",
      Operator::Greater => "$greater",
      Operator::GreaterEquals => "$greaterEquals",
      Operator::And => "$and",
      Operator::Or => "$or",
      Operator::Not => "$not",
      Operator::Like => "$like",
      Operator::Contains => "$contains",
      Operator::StartsWith => "$startsWith",
      Operator::EndsWith => "$endsWith",
      Operator::RegexMatch => "$regexMatch",
      Operator::Filter => "$filter",
      Operator::Select => "$select",
      Operator::Project => "$project",
      Operator::SelectMany => "$selectMany",
      Operator::OrderBy => "$orderBy",
      Operator::OrderByDescending => "$orderByDescending",
      Operator::Limit => "$limit",
      Operator::Skip => "$skip",
      Operator::Count => "$count",
      Operator::Any => "$any",
      Operator::All => "$all",
      Operator::Min => "$min",
      Operator::Max => "$max",
      Operator::Sum => "$sum",
      Operator::Average => "$average",
      Operator::Index => "$index",
      Operator::Literal => "$literal",
    }
  }

  pub fn category(self) -> Category {
    use Operator::*;

    match self {
      Add | Subtract | Multiply | Divide | Modulo | Negate => Category::Arithmetic,
      Equals | NotEquals | Less | LessEquals | Greater | GreaterEquals => Category::Relational,
      And | Or | Not => Category::Logical,
      Like | Contains | StartsWith | EndsWith | RegexMatch => Category::PatternMatch,
      Filter | Select | Project | SelectMany | OrderBy | OrderByDescending | Limit | Skip => {
        Category::CollectionManipulation
      }
      Count | Any | All | Min | Max | Sum | Average | Index => Category::CollectionAggregation,
      Literal => Category::Literal,
    }
  }

  pub fn shape(self) -> Shape {
    use Operator::*;

    match self {
      Negate | Not => Shape::Unary,
      Filter | Select | Project | SelectMany | OrderBy | OrderByDescending | All => Shape::Lambda,
      Count | Any | Min | Max | Sum | Average => Shape::OptionalLambda,
      Limit | Skip | Index => Shape::Counted,
      Literal => Shape::Literal,
      _ => Shape::Binary,
    }
  }
}

impl fmt::Display for Operator {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.key())
  }
}
