use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use analysis::{FirstTable, FollowTable, Ll1Table, LrKind, LrTable};
use getopts::{Matches, Options};
use grammar::{NonTerminal, Symbol, TransformLog};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;
use webql::{report, Compiler, Config, Error, InMemorySource, TableKind, Type};

fn main() {
  let args = env::args().collect::<Vec<_>>();
  let prog = args[0].clone();

  let command = match args.get(1).map(String::as_str) {
    Some(command @ ("compile" | "run" | "grammar")) => command.to_owned(),
    Some("-h") | Some("--help") => {
      print_commands(&prog);
      return;
    }
    _ => {
      print_commands(&prog);
      process::exit(1);
    }
  };

  let mut opts = Options::new();
  match command.as_str() {
    "grammar" => {
      opts.optopt("t", "type",
        "Type of parsing table to build. Defaults to LALR.\n\
          Supported types: LL1, LR1, LALR (case insensitive)",
        "TYPE");
    }
    _ => {
      opts.optopt("c", "config", "Path of a TOML configuration file", "CONFIG");
      opts.optopt("s", "schema", "Path of a JSON schema of the element type", "SCHEMA");
      if command == "run" {
        opts.optopt("d", "data", "Path of a JSON array to run the query on", "DATA");
      }
    }
  }
  opts.optflag("h", "help", "Print this message");

  let matches = match opts.parse(&args[2..]) {
    Ok(m) => m,
    Err(err) => {
      eprintln!("{}", err);
      process::exit(1);
    }
  };

  if matches.opt_present("h") {
    print_usage(&prog, &command, opts);
    return;
  }

  let arg = if matches.free.len() == 1 {
    matches.free[0].clone()
  } else {
    print_usage(&prog, &command, opts);
    process::exit(1);
  };

  let result = match command.as_str() {
    "grammar" => analyze_grammar(&matches, &arg),
    _ => query(&command, &matches, &arg),
  };
  if let Err(message) = result {
    eprint!("{}", message);
    process::exit(1);
  }
}

fn print_commands(prog: &str) {
  println!("Usage: {} COMMAND [options] ARG\n", prog);
  println!("Commands:");
  println!("    compile    Compile a query and print its expression");
  println!("    run        Run a query on JSON data and print the result");
  println!("    grammar    Analyze a token grammar and print its parsing table");
}

fn print_usage(prog: &str, command: &str, opts: Options) {
  let brief = match command {
    "grammar" => format!("Usage: {} grammar [options] PATH", prog),
    _ => format!("Usage: {} {} [options] QUERY", prog, command),
  };
  print!("{}", opts.usage(&brief));
}

fn init_logging(directive: Option<&str>) {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(directive.unwrap_or("warn")))
    .unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn canonical(path: &str) -> Result<PathBuf, String> {
  dunce::canonicalize(path).map_err(|err| format!("cannot open {}: {}\n", path, err))
}

fn query(command: &str, matches: &Matches, text: &str) -> Result<(), String> {
  let config = match matches.opt_str("c") {
    Some(path) => Config::load(canonical(&path)?).map_err(|err| format!("{}\n", err))?,
    None => Config::default(),
  };
  init_logging(config.log.as_deref());

  let fail = |err: Error| report::render("query", text, &err);
  let compiler = Compiler::new(config).map_err(|err| format!("{}\n", err))?;

  let schema = match matches.opt_str("s") {
    Some(path) => Some(load_schema(&canonical(&path)?).map_err(fail)?),
    None => None,
  };
  let element = match (command, schema) {
    (_, Some(element)) => element,
    ("run", None) => return Err("`run` needs a schema, pass it with -s\n".to_owned()),
    (_, None) => {
      let node = compiler.parse(text).map_err(fail)?;
      println!("{}", node);
      return Ok(());
    }
  };

  let query = compiler.compile(text, &element).map_err(fail)?;
  if command == "compile" {
    println!("{}", query);
    println!("// {} -> {}, {}", query.input_type(), query.output_type(), query.strategy());
    return Ok(());
  }

  let data_path = match matches.opt_str("d") {
    Some(path) => canonical(&path)?,
    None => return Err("`run` needs data, pass it with -d\n".to_owned()),
  };
  let data = fs::read_to_string(&data_path)
    .map_err(|err| format!("cannot read {}: {}\n", data_path.display(), err))?;
  let data = serde_json::from_str::<serde_json::Value>(&data)
    .map_err(|err| format!("invalid data in {}: {}\n", data_path.display(), err))?;

  let source = InMemorySource::from_json(element, &data).map_err(|err| fail(err.into()))?;
  let result = query.execute(&source).map_err(|err| fail(err.into()))?;
  let json = result.to_json(&query.output_type());
  println!("{}", serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string()));
  Ok(())
}

fn load_schema(path: &Path) -> Result<Type, Error> {
  Ok(Type::load_schema(path)?)
}

fn analyze_grammar(matches: &Matches, path: &str) -> Result<(), String> {
  init_logging(None);

  let kind = match matches.opt_str("t") {
    Some(ty) => ty.parse::<TableKind>().map_err(|err| format!("{}\n", err))?,
    None => TableKind::Lalr,
  };
  let path = canonical(path)?;
  let text = fs::read_to_string(&path)
    .map_err(|err| format!("cannot read {}: {}\n", path.display(), err))?;
  let fail = |err: analysis::Error| analysis::report::report(&path, &text, &err);

  let mut log = TransformLog::new();
  let mut set = grammar::build_logged(&text, &mut log).map_err(|err| fail(err.into()))?;

  let table = match kind {
    TableKind::Ll1 => {
      analysis::normalize(&mut set, &mut log).map_err(fail)?;
      Ll1Table::build(&set).map_err(fail)?.to_string()
    }
    TableKind::Lr1 => LrTable::build(&set, LrKind::Canonical).map_err(fail)?.to_string(),
    TableKind::Lalr => LrTable::build(&set, LrKind::Lalr).map_err(fail)?.to_string(),
  };

  if !log.is_empty() {
    println!("transformations:\n{}", log);
  }
  println!("productions:\n{}", set);

  let first = FirstTable::compute(&set);
  let follow = FollowTable::compute(&set, &first);
  println!("first:");
  print_sets(first.iter());
  println!("\nfollow:");
  print_sets(follow.iter());

  println!("\n{} table:\n{}", kind, table);
  Ok(())
}

fn print_sets<'a>(sets: impl Iterator<Item = (&'a NonTerminal, &'a grammar::Set<Symbol>)>) {
  for (nt, symbols) in sets {
    println!("  {}: {}", nt, symbols.iter().join(", "));
  }
}
