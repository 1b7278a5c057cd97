use std::fmt;

/// A grammar symbol matching a token. Two terminals are equal when both the
/// tag and the literal value match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Terminal {
  tag: String,
  value: Option<String>,
}

impl Terminal {
  pub fn new(tag: impl Into<String>) -> Self {
    Self {
      tag: tag.into(),
      value: None,
    }
  }

  pub fn with_value(tag: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      tag: tag.into(),
      value: Some(value.into()),
    }
  }

  pub fn tag(&self) -> &str {
    &self.tag
  }

  pub fn value(&self) -> Option<&str> {
    self.value.as_deref()
  }
}

impl fmt::Display for Terminal {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(&self.tag)
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonTerminal(String);

impl NonTerminal {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn name(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for NonTerminal {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
  Terminal(Terminal),
  NonTerminal(NonTerminal),
  Epsilon,
  EndOfInput,
}

impl Symbol {
  pub fn terminal(tag: impl Into<String>) -> Self {
    Symbol::Terminal(Terminal::new(tag))
  }

  pub fn nonterminal(name: impl Into<String>) -> Self {
    Symbol::NonTerminal(NonTerminal::new(name))
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Symbol::Terminal(_))
  }

  pub fn is_nonterminal(&self) -> bool {
    matches!(self, Symbol::NonTerminal(_))
  }

  pub fn is_epsilon(&self) -> bool {
    matches!(self, Symbol::Epsilon)
  }

  pub fn as_terminal(&self) -> Option<&Terminal> {
    match self {
      Symbol::Terminal(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_nonterminal(&self) -> Option<&NonTerminal> {
    match self {
      Symbol::NonTerminal(nt) => Some(nt),
      _ => None,
    }
  }
}

impl From<Terminal> for Symbol {
  fn from(t: Terminal) -> Self {
    Symbol::Terminal(t)
  }
}

impl From<NonTerminal> for Symbol {
  fn from(nt: NonTerminal) -> Self {
    Symbol::NonTerminal(nt)
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Symbol::Terminal(t) => fmt::Display::fmt(t, f),
      Symbol::NonTerminal(nt) => fmt::Display::fmt(nt, f),
      Symbol::Epsilon => f.write_str("ε"),
      Symbol::EndOfInput => f.write_str("$"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn terminal_equality_includes_value() {
    assert_eq!(Terminal::with_value("op", "+"), Terminal::with_value("op", "+"));
    assert_ne!(Terminal::with_value("op", "+"), Terminal::with_value("op", "-"));
    assert_ne!(Terminal::new("op"), Terminal::with_value("op", "+"));
  }

  #[test]
  fn display() {
    assert_eq!(Symbol::nonterminal("E'").to_string(), "E'");
    assert_eq!(Symbol::Epsilon.to_string(), "ε");
    assert_eq!(Symbol::EndOfInput.to_string(), "$");
  }
}
