use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::{self, termcolor::NoColor};
use crate::Error;

/// Renders an error as a diagnostic pointing into `text`. Grammar errors
/// are rendered against the grammar text in `text` instead.
pub fn render(name: &str, text: &str, err: &Error) -> String {
  if let Error::Grammar(err) = err {
    return analysis::report::report(name, text, err);
  }

  let mut diagnostic = Diagnostic::error().with_message(err.to_string());

  if let Some(span) = err.span() {
    let start = span.start.min(text.len());
    let end = span.end.clamp(start, text.len());
    let label = match err {
      Error::Lex(_) => "malformed query text",
      Error::Parse(_) => "unexpected shape",
      Error::Binding(_) => "cannot be typed",
      _ => "cannot be translated",
    };
    diagnostic = diagnostic.with_labels(vec![Label::primary((), start..end).with_message(label)]);
  }
  if !err.is_invalid_query() {
    diagnostic = diagnostic.with_notes(vec!["this is an internal error".to_owned()]);
  }

  let file = SimpleFile::new(name, text);
  let mut out = NoColor::new(Vec::new());
  match term::emit(&mut out, &term::Config::default(), &file, &diagnostic) {
    Ok(()) => String::from_utf8_lossy(&out.into_inner()).into_owned(),
    Err(_) => format!("error: {}\n", err),
  }
}
