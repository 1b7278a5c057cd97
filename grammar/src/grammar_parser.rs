//! Reader for the textual grammar format:
//!
//! ```text
//! %token plus "+"
//! %token num
//! %start E
//!
//! E = E plus T
//!   | T
//! T = num | ()
//! ```

pub mod lex;

use lex::{Lexer, Token, TokenKind};
use crate::error::{GrammarError, SyntaxErrorKind};
use crate::production_set::{ProductionSet, ProductionSetBuilder};
use crate::symbol::{NonTerminal, Symbol, Terminal};
use crate::sentence::Sentence;
use crate::Map;

type Span = (usize, usize);

struct RuleDecl {
  name: String,
  alts: Vec<Vec<(String, Span)>>,
}

struct Parser<'a> {
  tokens: Vec<(usize, Token<'a>, usize)>,
  pos: usize,
  len: usize,
}

/// Parses grammar text into a production set. Alternatives written with `|`
/// are kept as macros.
pub fn parse(input: &str) -> Result<ProductionSet, GrammarError> {
  let tokens = Lexer::new(input).collect::<Result<Vec<_>, _>>()?;
  let mut parser = Parser {
    tokens,
    pos: 0,
    len: input.len(),
  };

  let mut terminals = Map::<String, Terminal>::default();
  let mut start = None;
  let mut rules: Vec<RuleDecl> = vec![];

  loop {
    parser.skip_newlines();
    let (l, tok, r) = match parser.advance() {
      Some(t) => t,
      None => break,
    };

    match tok.kind {
      TokenKind::Token => {
        let (name, span) = parser.expect_ident()?;
        if terminals.contains_key(&name) {
          return Err(GrammarError::syntax(
            SyntaxErrorKind::NameConflict,
            format!("token `{}` is declared twice", name),
            span));
        }

        let terminal = match parser.peek_kind() {
          Some(TokenKind::String) => {
            let (_, lit, _) = parser.advance().unwrap();
            Terminal::with_value(name.clone(), unquote(lit.text))
          }
          _ => Terminal::new(name.clone()),
        };
        terminals.insert(name, terminal);
        parser.expect_line_end()?;
      }
      TokenKind::Start => {
        let (name, _) = parser.expect_ident()?;
        start = Some(name);
        parser.expect_line_end()?;
      }
      TokenKind::Ident => {
        let name = tok.text.to_owned();
        if terminals.contains_key(&name) || rules.iter().any(|rule| rule.name == name) {
          return Err(GrammarError::syntax(
            SyntaxErrorKind::NameConflict,
            format!("`{}` is already defined", name),
            (l, r)));
        }
        parser.expect(TokenKind::Assign, "`=`")?;
        let alts = parser.alternatives()?;
        rules.push(RuleDecl { name, alts });
      }
      _ => {
        return Err(GrammarError::syntax(
          SyntaxErrorKind::UnexpectedToken,
          format!("expected a declaration, found `{}`", tok.text),
          (l, r)));
      }
    }
  }

  let mut builder = ProductionSetBuilder::new();
  if let Some(start) = start {
    builder = builder.start(NonTerminal::new(start));
  }

  for rule in rules {
    let alts = rule.alts.into_iter().map(|alt| {
      Sentence::new(alt.into_iter().map(|(name, _)| {
        if name.is_empty() {
          Symbol::Epsilon
        } else if let Some(t) = terminals.get(&name) {
          Symbol::Terminal(t.clone())
        } else {
          Symbol::nonterminal(name)
        }
      }).collect())
    }).collect();

    builder = builder.alternatives(NonTerminal::new(rule.name), alts);
  }

  Ok(builder.build()?)
}

impl<'a> Parser<'a> {
  fn peek_kind(&self) -> Option<TokenKind> {
    self.tokens.get(self.pos).map(|t| t.1.kind)
  }

  fn advance(&mut self) -> Option<(usize, Token<'a>, usize)> {
    let tok = self.tokens.get(self.pos).cloned();
    if tok.is_some() {
      self.pos += 1;
    }
    tok
  }

  fn skip_newlines(&mut self) {
    while let Some(TokenKind::Newline) = self.peek_kind() {
      self.pos += 1;
    }
  }

  fn unexpected(&self, expected: &str) -> GrammarError {
    match self.tokens.get(self.pos) {
      Some((l, tok, r)) => GrammarError::syntax(
        SyntaxErrorKind::UnexpectedToken,
        format!("expected {}, found `{}`", expected, tok.text.escape_default()),
        (*l, *r)),
      None => GrammarError::syntax(
        SyntaxErrorKind::UnexpectedToken,
        format!("expected {}, found EOF", expected),
        (self.len, self.len)),
    }
  }

  fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Span, GrammarError> {
    if self.peek_kind() == Some(kind) {
      let (l, _, r) = self.advance().unwrap();
      Ok((l, r))
    } else {
      Err(self.unexpected(expected))
    }
  }

  fn expect_ident(&mut self) -> Result<(String, Span), GrammarError> {
    if self.peek_kind() == Some(TokenKind::Ident) {
      let (l, tok, r) = self.advance().unwrap();
      Ok((tok.text.to_owned(), (l, r)))
    } else {
      Err(self.unexpected("an identifier"))
    }
  }

  fn expect_line_end(&mut self) -> Result<(), GrammarError> {
    match self.peek_kind() {
      None => Ok(()),
      Some(TokenKind::Newline) => {
        self.pos += 1;
        Ok(())
      }
      Some(_) => Err(self.unexpected("end of line")),
    }
  }

  /// `alt ('|' alt)*`, where a `|` may start a continuation line.
  fn alternatives(&mut self) -> Result<Vec<Vec<(String, Span)>>, GrammarError> {
    let mut alts = vec![self.alternative()?];

    loop {
      let save = self.pos;
      self.skip_newlines();
      if self.peek_kind() == Some(TokenKind::Or) {
        self.pos += 1;
        alts.push(self.alternative()?);
      } else {
        self.pos = save;
        break;
      }
    }

    Ok(alts)
  }

  /// A sequence of names. `()` stands for epsilon and is returned as an
  /// empty name.
  fn alternative(&mut self) -> Result<Vec<(String, Span)>, GrammarError> {
    let mut symbols = vec![];

    loop {
      match self.peek_kind() {
        Some(TokenKind::Ident) => {
          let (name, span) = self.expect_ident()?;
          symbols.push((name, span));
        }
        Some(TokenKind::LParen) => {
          let (l, _) = self.expect(TokenKind::LParen, "`(`")?;
          let (_, r) = self.expect(TokenKind::RParen, "`)`")?;
          symbols.push((String::new(), (l, r)));
        }
        _ => break,
      }
    }

    if symbols.is_empty() {
      Err(self.unexpected("a symbol or `()`"))
    } else {
      Ok(symbols)
    }
  }
}

fn unquote(text: &str) -> String {
  let inner = &text[1..text.len() - 1];
  let mut buf = String::with_capacity(inner.len());
  let mut chars = inner.chars();
  while let Some(c) = chars.next() {
    if c == '\\' {
      match chars.next() {
        Some('n') => buf.push('\n'),
        Some('t') => buf.push('\t'),
        Some(c) => buf.push(c),
        None => {}
      }
    } else {
      buf.push(c);
    }
  }
  buf
}
