//! Executable query expressions. `Display` renders them in method-chain
//! form, `source.Where(x => (x.Age > 18))`.

use std::fmt;
use std::sync::Arc;
use itertools::Itertools;
use regex::Regex;
use crate::operator::Operator;
use crate::types::{Member, RecordType, Type};
use crate::value::Value;

/// How a compiled query runs: handed to the source's provider, or evaluated
/// in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
  Queryable,
  Enumerable,
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(match self {
      Strategy::Queryable => "queryable",
      Strategy::Enumerable => "enumerable",
    })
  }
}

/// Higher-order sequence methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Where,
  Select,
  SelectMany,
  OrderBy,
  OrderByDescending,
  Take,
  Skip,
  Count,
  Any,
  All,
  Min,
  Max,
  Sum,
  Average,
  ElementAt,
}

impl Method {
  pub fn for_operator(op: Operator) -> Option<Method> {
    Some(match op {
      Operator::Filter => Method::Where,
      Operator::Select | Operator::Project => Method::Select,
      Operator::SelectMany => Method::SelectMany,
      Operator::OrderBy => Method::OrderBy,
      Operator::OrderByDescending => Method::OrderByDescending,
      Operator::Limit => Method::Take,
      Operator::Skip => Method::Skip,
      Operator::Count => Method::Count,
      Operator::Any => Method::Any,
      Operator::All => Method::All,
      Operator::Min => Method::Min,
      Operator::Max => Method::Max,
      Operator::Sum => Method::Sum,
      Operator::Average => Method::Average,
      Operator::Index => Method::ElementAt,
      _ => return None,
    })
  }

  pub fn name(self) -> &'static str {
    match self {
      Method::Where => "Where",
      Method::Select => "Select",
      Method::SelectMany => "SelectMany",
      Method::OrderBy => "OrderBy",
      Method::OrderByDescending => "OrderByDescending",
      Method::Take => "Take",
      Method::Skip => "Skip",
      Method::Count => "Count",
      Method::Any => "Any",
      Method::All => "All",
      Method::Min => "Min",
      Method::Max => "Max",
      Method::Sum => "Sum",
      Method::Average => "Average",
      Method::ElementAt => "ElementAt",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A method resolved for one strategy and element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
  pub strategy: Strategy,
  pub method: Method,
  pub element: Type,
}

impl fmt::Display for MethodBinding {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let owner = match self.strategy {
      Strategy::Queryable => "Queryable",
      Strategy::Enumerable => "Enumerable",
    };
    write!(f, "{}.{}<{}>", owner, self.method, self.element)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Negate,
  Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Subtract,
  Multiply,
  Divide,
  Modulo,
  Equal,
  NotEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
  AndAlso,
  OrElse,
}

impl BinaryOp {
  pub fn for_operator(op: Operator) -> Option<BinaryOp> {
    Some(match op {
      Operator::Add => BinaryOp::Add,
      Operator::Subtract => BinaryOp::Subtract,
      Operator::Multiply => BinaryOp::Multiply,
      Operator::Divide => BinaryOp::Divide,
      Operator::Modulo => BinaryOp::Modulo,
      Operator::Equals => BinaryOp::Equal,
      Operator::NotEquals => BinaryOp::NotEqual,
      Operator::Less => BinaryOp::Less,
      Operator::LessEquals => BinaryOp::LessEqual,
      Operator::Greater => BinaryOp::Greater,
      Operator::GreaterEquals => BinaryOp::GreaterEqual,
      Operator::And => BinaryOp::AndAlso,
      Operator::Or => BinaryOp::OrElse,
      _ => return None,
    })
  }

  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Subtract => "-",
      BinaryOp::Multiply => "*",
      BinaryOp::Divide => "/",
      BinaryOp::Modulo => "%",
      BinaryOp::Equal => "==",
      BinaryOp::NotEqual => "!=",
      BinaryOp::Less => "<",
      BinaryOp::LessEqual => "<=",
      BinaryOp::Greater => ">",
      BinaryOp::GreaterEqual => ">=",
      BinaryOp::AndAlso => "&&",
      BinaryOp::OrElse => "||",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
  Like,
  Contains,
  StartsWith,
  EndsWith,
  Regex,
}

impl MatchKind {
  pub fn for_operator(op: Operator) -> Option<MatchKind> {
    Some(match op {
      Operator::Like => MatchKind::Like,
      Operator::Contains => MatchKind::Contains,
      Operator::StartsWith => MatchKind::StartsWith,
      Operator::EndsWith => MatchKind::EndsWith,
      Operator::RegexMatch => MatchKind::Regex,
      _ => return None,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
  pub name: String,
  pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Expr {
  Constant {
    value: Value,
    ty: Type,
  },
  Parameter(Param),
  Member {
    target: Box<Expr>,
    member: Member,
  },
  Unary {
    op: UnaryOp,
    operand: Box<Expr>,
    ty: Type,
  },
  Binary {
    op: BinaryOp,
    left: Box<Expr>,
    right: Box<Expr>,
    ty: Type,
  },
  Convert {
    operand: Box<Expr>,
    ty: Type,
  },
  Match {
    kind: MatchKind,
    target: Box<Expr>,
    pattern: Box<Expr>,
    /// Set when the pattern is a constant.
    compiled: Option<Regex>,
  },
  Call {
    binding: MethodBinding,
    source: Box<Expr>,
    args: Vec<Expr>,
    ty: Type,
  },
  Lambda {
    param: Param,
    body: Box<Expr>,
  },
  New {
    record: Arc<RecordType>,
    fields: Vec<Expr>,
  },
  Invoke {
    lambda: Box<Expr>,
    arg: Box<Expr>,
  },
}

impl Expr {
  /// Static type of the expression. A lambda has the type of its body.
  pub fn ty(&self) -> Type {
    match self {
      Expr::Constant { ty, .. }
      | Expr::Unary { ty, .. }
      | Expr::Binary { ty, .. }
      | Expr::Convert { ty, .. }
      | Expr::Call { ty, .. } => ty.clone(),
      Expr::Parameter(param) => param.ty.clone(),
      Expr::Member { member, .. } => member.ty.clone(),
      Expr::Match { .. } => Type::Bool,
      Expr::Lambda { body, .. } => body.ty(),
      Expr::New { record, .. } => Type::Record(Arc::clone(record)),
      Expr::Invoke { lambda, .. } => lambda.ty(),
    }
  }
}

/// Translates a `$like` pattern, where `%` matches any run of characters
/// and `_` any single character.
pub fn like_regex(pattern: &str) -> Result<Regex, regex::Error> {
  // wildcards match line breaks too
  let mut re = String::from("(?s)^");
  for c in pattern.chars() {
    match c {
      '%' => re.push_str(".*"),
      '_' => re.push('.'),
      c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
    }
  }
  re.push('$');
  Regex::new(&re)
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Expr::Constant { value, .. } => write!(f, "{}", value),
      Expr::Parameter(param) => f.write_str(&param.name),
      Expr::Member { target, member } => write!(f, "{}.{}", target, member.name),
      Expr::Unary { op: UnaryOp::Negate, operand, .. } => write!(f, "-{}", operand),
      Expr::Unary { op: UnaryOp::Not, operand, .. } => write!(f, "!{}", operand),
      Expr::Binary { op, left, right, .. } => write!(f, "({} {} {})", left, op.symbol(), right),
      Expr::Convert { operand, ty } => write!(f, "Convert({}, {})", operand, ty),
      Expr::Match { kind, target, pattern, .. } => match kind {
        MatchKind::Like => write!(f, "Like({}, {})", target, pattern),
        MatchKind::Contains => write!(f, "{}.Contains({})", target, pattern),
        MatchKind::StartsWith => write!(f, "{}.StartsWith({})", target, pattern),
        MatchKind::EndsWith => write!(f, "{}.EndsWith({})", target, pattern),
        MatchKind::Regex => write!(f, "Regex.IsMatch({}, {})", target, pattern),
      },
      Expr::Call { binding, source, args, .. } => {
        write!(f, "{}.{}({})", source, binding.method, args.iter().join(", "))
      }
      Expr::Lambda { param, body } => write!(f, "{} => {}", param.name, body),
      Expr::New { record, fields } => {
        write!(f, "new {{{}}}", record.fields().iter()
          .zip(fields)
          .map(|(field, value)| format!("{} = {}", field.name, value))
          .join(", "))
      }
      Expr::Invoke { lambda, arg } => write!(f, "({})({})", lambda, arg),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn like_patterns() {
    let re = like_regex("A%e_").unwrap();
    assert!(re.is_match("Alice!"));
    assert!(re.is_match("Ae."));
    assert!(!re.is_match("Bob"));
    assert!(!re.is_match("Alice"));

    assert!(like_regex("a.b").unwrap().is_match("a.b"));
    assert!(!like_regex("a.b").unwrap().is_match("axb"));

    assert!(like_regex("a_b").unwrap().is_match("a\nb"));
    assert!(like_regex("a%").unwrap().is_match("a\nb\nc"));
  }

  #[test]
  fn display() {
    let x = Param { name: "x".to_owned(), ty: Type::Int };
    let body = Expr::Binary {
      op: BinaryOp::Greater,
      left: Box::new(Expr::Parameter(x.clone())),
      right: Box::new(Expr::Constant { value: Value::Int(18), ty: Type::Int }),
      ty: Type::Bool,
    };
    let call = Expr::Call {
      binding: MethodBinding { strategy: Strategy::Enumerable, method: Method::Where, element: Type::Int },
      source: Box::new(Expr::Parameter(Param { name: "source".to_owned(), ty: Type::seq(Type::Int) })),
      args: vec![Expr::Lambda { param: x, body: Box::new(body) }],
      ty: Type::seq(Type::Int),
    };

    assert_eq!(call.to_string(), "source.Where(x => (x > 18))");
    assert_eq!(call.ty(), Type::seq(Type::Int));
    assert_eq!(Value::List(vec![Value::Float(1.0), Value::String("a".to_owned())]).to_string(), r#"[1.0, "a"]"#);
  }

  #[test]
  fn method_bindings() {
    assert_eq!(Method::for_operator(Operator::Project), Some(Method::Select));
    assert_eq!(Method::for_operator(Operator::Add), None);

    let binding = MethodBinding { strategy: Strategy::Queryable, method: Method::Take, element: Type::String };
    assert_eq!(binding.to_string(), "Queryable.Take<string>");
  }
}
