use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::tables::TableKind;

/// Compiler settings, read from a TOML file. Every key is optional.
///
/// ```toml
/// table = "lalr"
/// max_query_len = 65536
/// max_depth = 64
/// log = "webql=debug"
/// grammar = "webql.grammar"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Parsing table that drives tokenization.
  pub table: TableKind,
  /// Longest accepted query text, in bytes.
  pub max_query_len: usize,
  /// Deepest accepted nesting of arrays and objects.
  pub max_depth: usize,
  /// `tracing` filter used when `RUST_LOG` is not set.
  pub log: Option<String>,
  /// Token grammar replacing the built-in one.
  pub grammar: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      table: TableKind::default(),
      max_query_len: 64 * 1024,
      max_depth: 64,
      log: None,
      grammar: None,
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("cannot read config file {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    source: io::Error,
  },
  #[error("invalid config: {0}")]
  Toml(#[from] toml::de::Error),
}

impl Config {
  /// Reads a config file. A relative `grammar` path is taken relative to
  /// the directory of the config file.
  pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
      .map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
      })?;

    let mut config = Config::from_toml(&text)?;
    if let (Some(grammar), Some(dir)) = (&config.grammar, path.parent()) {
      if grammar.is_relative() {
        config.grammar = Some(dir.join(grammar));
      }
    }
    Ok(config)
  }

  pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(text)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn defaults() {
    assert_eq!(Config::from_toml("").unwrap(), Config::default());
    assert_eq!(Config::default().max_query_len, 65536);
  }

  #[test]
  fn partial_config() {
    let config = Config::from_toml("table = \"ll1\"\nmax_depth = 8\n").unwrap();

    assert_eq!(config, Config {
      table: TableKind::Ll1,
      max_depth: 8,
      ..Config::default()
    });
  }

  #[test]
  fn rejects_unknown_keys() {
    let err = Config::from_toml("tabel = \"ll1\"\n").unwrap_err();
    assert!(err.to_string().contains("unknown field `tabel`"), "{}", err);
  }

  #[test]
  fn rejects_unknown_table() {
    assert!(Config::from_toml("table = \"slr\"\n").is_err());
  }
}
