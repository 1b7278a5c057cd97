//! WebQL: a JSON-shaped query language compiled to executable queries.
//!
//! Query text goes through a table-driven tokenizer, a syntax parser, a
//! binder that types it against the shape of the data, and a translator
//! that produces a [`CompiledQuery`]:
//!
//! ```no_run
//! use webql::{Compiler, InMemorySource, Type};
//!
//! let person = Type::load_schema("person.json").unwrap();
//! let query = Compiler::default()
//!   .compile(r#"{"$filter": {"$greater": ["$age", 18]}}"#, &person)
//!   .unwrap();
//! let data = serde_json::json!([{"name": "Ann", "age": 30}]);
//! let result = query.execute(&InMemorySource::from_json(person, &data).unwrap()).unwrap();
//! ```

use std::sync::Arc;
use tracing::debug;

pub mod ast;
pub mod bind;
pub mod config;
pub mod eval;
pub mod expr;
pub mod lex;
pub mod operator;
pub mod parse;
pub mod query;
pub mod report;
pub mod tables;
pub mod token;
pub mod translate;
pub mod types;
pub mod value;
mod error;

pub use ast::Node;
pub use bind::{Bound, BindingError};
pub use config::{Config, ConfigError};
pub use error::Error;
pub use eval::ExecutionError;
pub use expr::{Expr, Method, MethodBinding, Strategy};
pub use lex::{LexError, Span};
pub use parse::ParseError;
pub use query::{CompiledQuery, InMemorySource, QuerySource};
pub use tables::{TableKind, Tables};
pub use token::{Token, Tokenizer};
pub use translate::{CapabilityProvider, DefaultCapabilities, SourceDescriptor, TranslationError};
pub use types::{DeclaredShapes, FieldType, Member, RecordType, ShapeProvider, Type};
pub use value::Value;

pub(crate) use grammar::Map;

/// Runs the pipeline with one configuration and one pair of collaborators.
/// A compiler holds no per-query state and can be shared between threads.
#[derive(Clone)]
pub struct Compiler {
  config: Config,
  tables: Arc<Tables>,
  shapes: Arc<dyn ShapeProvider + Send + Sync>,
  capabilities: Arc<dyn CapabilityProvider + Send + Sync>,
}

impl Default for Compiler {
  fn default() -> Self {
    Compiler {
      config: Config::default(),
      tables: Tables::embedded(),
      shapes: Arc::new(DeclaredShapes),
      capabilities: Arc::new(DefaultCapabilities),
    }
  }
}

impl Compiler {
  /// Loads the configured grammar, if any, and builds its tables.
  pub fn new(config: Config) -> Result<Compiler, Error> {
    let tables = match &config.grammar {
      Some(path) => Arc::new(Tables::load(path)?),
      None => Tables::embedded(),
    };
    Ok(Compiler { config, tables, ..Compiler::default() })
  }

  pub fn with_shapes(mut self, shapes: impl ShapeProvider + Send + Sync + 'static) -> Self {
    self.shapes = Arc::new(shapes);
    self
  }

  pub fn with_capabilities(
    mut self,
    capabilities: impl CapabilityProvider + Send + Sync + 'static,
  ) -> Self {
    self.capabilities = Arc::new(capabilities);
    self
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn tables(&self) -> &Tables {
    &self.tables
  }

  pub fn tokenize(&self, text: &str) -> Result<Token, Error> {
    let token = Tokenizer::new(&self.tables, &self.config).tokenize(text)?;
    debug!(len = text.len(), table = %self.config.table, "tokenized");
    Ok(token)
  }

  pub fn parse(&self, text: &str) -> Result<Node, Error> {
    let node = parse::parse(&self.tokenize(text)?)?;
    debug!(query = %node, "parsed");
    Ok(node)
  }

  /// Parses and binds a query over a sequence of `element`.
  pub fn bind(&self, text: &str, element: &Type) -> Result<Bound, Error> {
    let node = self.parse(text)?;
    let bound = bind::bind(&node, &Type::seq(element.clone()), &*self.shapes)?;
    debug!(ty = %bound.ty, "bound");
    Ok(bound)
  }

  /// Compiles a query over an in-memory sequence of `element`.
  pub fn compile(&self, text: &str, element: &Type) -> Result<CompiledQuery, Error> {
    self.compile_for(text, &SourceDescriptor::new(element.clone()))
  }

  pub fn compile_for(&self, text: &str, source: &SourceDescriptor) -> Result<CompiledQuery, Error> {
    let bound = self.bind(text, &source.element)?;
    Ok(translate::translate(&bound, source, &*self.capabilities)?)
  }
}

/// Compiles a query over a sequence of `element` with the default
/// configuration.
pub fn compile(text: &str, element: &Type) -> Result<CompiledQuery, Error> {
  Compiler::default().compile(text, element)
}
