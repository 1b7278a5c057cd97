use std::str::CharIndices;
use std::iter::Peekable;
use crate::error::{GrammarError, SyntaxErrorKind};

pub type Spanned<Tok, Loc, Error> = Result<(Loc, Tok, Loc), Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
  Start,
  Token,

  Ident,
  String,

  Assign,
  Or,
  LParen,
  RParen,

  Newline,
}

#[derive(Clone, Debug)]
pub struct Token<'a> {
  pub kind: TokenKind,
  pub text: &'a str,
}

pub struct Lexer<'a> {
  input: &'a str,
  chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
  pub fn new(input: &'a str) -> Self {
    Self {
      input,
      chars: input.char_indices().peekable(),
    }
  }

  fn token(
    &self, kind: TokenKind, start: usize, end: usize
  ) -> Option<<Self as Iterator>::Item> {
    let token = Token {
      kind,
      text: &self.input[start..end],
    };
    Some(Ok((start, token, end)))
  }

  fn error(
    &self, kind: SyntaxErrorKind, message: &str, start: usize, end: usize
  ) -> Option<<Self as Iterator>::Item> {
    Some(Err(GrammarError::syntax(kind, message, (start, end))))
  }

  fn ident_end(&mut self, start: usize) -> usize {
    let mut end = start;
    while let Some(&(i, c)) = self.chars.peek() {
      if !(c.is_alphanumeric() || c == '_' || c == '\'' || c == '-') {
        break;
      }
      end = i + c.len_utf8();
      self.chars.next();
    }
    end
  }
}

impl<'a> Iterator for Lexer<'a> {
  type Item = Spanned<Token<'a>, usize, GrammarError>;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(&(_, ' ' | '\t' | '\r')) = self.chars.peek() {
      self.chars.next();
    }

    let (j, c) = self.chars.next()?;

    match c {
      '\n' => self.token(TokenKind::Newline, j, j + 1),
      '/' => {
        if let Some((_, '/')) = self.chars.peek() {
          // comments run to the end of the line, the newline is kept
          while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
              break;
            }
            self.chars.next();
          }
          self.next()
        } else {
          self.error(SyntaxErrorKind::InvalidChar, "expected `//`", j, j + 1)
        }
      }
      '%' => {
        let end = self.ident_end(j + 1);
        match &self.input[j + 1..end] {
          "start" => self.token(TokenKind::Start, j, end),
          "token" => self.token(TokenKind::Token, j, end),
          _ => self.error(SyntaxErrorKind::InvalidChar, "unknown directive", j, end),
        }
      }
      '"' => {
        let mut unescaped = true;
        loop {
          match self.chars.next() {
            Some((_, '\\')) => {
              unescaped = !unescaped;
            }
            Some((k, '"')) if unescaped => {
              break self.token(TokenKind::String, j, k + 1);
            }
            Some((k, '\n')) => {
              break self.error(SyntaxErrorKind::UnclosedString, "unclosed string", j, k);
            }
            None => {
              let end = self.input.len();
              break self.error(SyntaxErrorKind::UnclosedString, "unclosed string", j, end);
            }
            _ => {
              unescaped = true;
            }
          }
        }
      }
      '=' => self.token(TokenKind::Assign, j, j + 1),
      '|' => self.token(TokenKind::Or, j, j + 1),
      '(' => self.token(TokenKind::LParen, j, j + 1),
      ')' => self.token(TokenKind::RParen, j, j + 1),
      _ if c.is_alphabetic() || c == '_' => {
        let end = self.ident_end(j + c.len_utf8());
        self.token(TokenKind::Ident, j, end)
      }
      _ => self.error(SyntaxErrorKind::InvalidChar, "invalid character", j, j + c.len_utf8()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::new(input)
      .map(|t| t.unwrap().1.kind)
      .collect()
  }

  #[test]
  fn tokens() {
    assert_eq!(
      kinds("%token plus \"+\" // comment\nE' = E plus | ()"),
      vec![
        TokenKind::Token, TokenKind::Ident, TokenKind::String, TokenKind::Newline,
        TokenKind::Ident, TokenKind::Assign, TokenKind::Ident, TokenKind::Ident,
        TokenKind::Or, TokenKind::LParen, TokenKind::RParen,
      ]);
  }

  #[test]
  fn identifiers_keep_primes_and_dashes() {
    let tokens = Lexer::new("PARAM-LIST E''").map(|t| t.unwrap().1.text).collect::<Vec<_>>();
    assert_eq!(tokens, vec!["PARAM-LIST", "E''"]);
  }

  #[test]
  fn unclosed_string() {
    let err = Lexer::new("%token a \"abc").last().unwrap().unwrap_err();
    match err {
      GrammarError::Syntax { kind, span, .. } => {
        assert_eq!(kind, SyntaxErrorKind::UnclosedString);
        assert_eq!(span, (9, 13));
      }
      other => panic!("unexpected error {:?}", other),
    }
  }
}
