use grammar::GrammarError;
use std::fmt::Write;
use std::path::Path;
use crate::{Conflict, Error, Ll1ConflictError, ReduceReduceConflictError, ShiftReduceConflictError};

/// Renders an analysis error for humans. `input` is the grammar text the
/// error came from, used to turn spans into line and column numbers.
pub fn report(
  path: impl AsRef<Path>,
  input: impl AsRef<str>,
  err: &Error,
) -> String {
  match err {
    Error::Grammar(err) => report_grammar_error(path, input, err),
    Error::Conflict(err) => {
      let mut buf = String::new();
      writeln!(&mut buf, "{}\n", err).unwrap();
      for conflict in &err.conflicts {
        buf.push_str(&match conflict {
          Conflict::Ll1(err) => report_ll1_conflict(err),
          Conflict::ShiftReduce(err) => report_sr_conflict(err),
          Conflict::ReduceReduce(err) => report_rr_conflict(err),
        });
        buf.push('\n');
      }
      buf
    }
    Error::LeftRecursion { cycle } => {
      format!("left recursion could not be removed:\n\n  {}\n", cycle.join(" -> "))
    }
    Error::NonProductive(nt) => {
      format!("non-terminal {} has only left-recursive productions\n\n  it derives no terminal string\n", nt)
    }
    Error::InvalidTable(message) => format!("invalid parsing table\nmessage: {}\n", message),
  }
}

pub fn report_grammar_error(
  path: impl AsRef<Path>,
  input: impl AsRef<str>,
  err: &GrammarError,
) -> String {
  let mut buf = String::new();

  match err {
    GrammarError::Syntax { kind, message, span } => {
      let input = input.as_ref();
      let lines = input[..span.0.min(input.len())].split('\n').collect::<Vec<_>>();
      let line = lines.len();
      let col = lines.last().map_or(0, |l| l.chars().count()) + 1;

      writeln!(&mut buf,
        "{} at {}:{}:{}",
        kind,
        path.as_ref().display(),
        line,
        col
      ).unwrap();
      writeln!(&mut buf,
        "message: {}", message
      ).unwrap();
    }
    err => {
      writeln!(&mut buf,
        "{}: {}", path.as_ref().display(), err
      ).unwrap();
    }
  }

  buf
}

fn report_ll1_conflict(
  err: &Ll1ConflictError
) -> String {
  let mut buf = String::new();

  writeln!(&mut buf,
    "LL(1) conflict at {} on lookahead {}, which can expand by:\n\n  {}\n\nor:\n\n  {}",
    err.nonterminal,
    err.lookahead,
    err.prod1,
    err.prod2,
  ).unwrap();

  buf
}

fn report_rr_conflict(
  err: &ReduceReduceConflictError
) -> String {
  let mut buf = String::new();

  writeln!(&mut buf,
    "reduce-reduce conflict at state:\n"
  ).unwrap();

  for item in &err.state_items {
    writeln!(&mut buf,
      "  {}", item,
    ).unwrap();
  }

  writeln!(&mut buf,
    "\nwhich can be reduced by:\n\n  {}\n\nor:\n\n  {}\n\nwhen the lookahead is {}",
    err.reduce1,
    err.reduce2,
    err.lookahead,
  ).unwrap();

  buf
}

fn report_sr_conflict(
  err: &ShiftReduceConflictError
) -> String {
  let mut buf = String::new();

  writeln!(&mut buf,
    "shift-reduce conflict at state:\n"
  ).unwrap();

  for item in &err.state_items {
    writeln!(&mut buf,
      "  {}", item,
    ).unwrap();
  }

  writeln!(&mut buf,
    "\nwhich can shift {}\nor reduce by:\n\n  {}",
    err.shift,
    err.reduce,
  ).unwrap();

  buf
}
