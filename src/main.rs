use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, ValueEnum};
use stackcc::{Syntax, compile, vm};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum SyntaxArg {
  #[default]
  Intel,
  Att,
}

impl From<SyntaxArg> for Syntax {
  fn from(arg: SyntaxArg) -> Self {
    match arg {
      SyntaxArg::Intel => Syntax::Intel,
      SyntaxArg::Att => Syntax::Att,
    }
  }
}

/// Compile integer expression statements to x86-64 assembly.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["program", "file"])))]
struct Cli {
  /// Program text, e.g. 'a=3; b=a*2; a+b;'
  program: Option<String>,

  /// Read the program from a file instead
  #[arg(short, long)]
  file: Option<PathBuf>,

  /// Assembler dialect of the listing
  #[arg(short, long, value_enum, default_value_t)]
  syntax: SyntaxArg,

  /// Write the listing here instead of stdout
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Execute the program and print the value of the last statement
  #[arg(long)]
  run: bool,
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_target(false)
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .init();

  let cli = Cli::parse();

  let source = match &cli.file {
    Some(path) => match fs::read_to_string(path) {
      Ok(source) => source,
      Err(err) => {
        eprintln!("cannot read {}: {err}", path.display());
        return ExitCode::FAILURE;
      }
    },
    None => cli.program.clone().unwrap_or_default(),
  };

  let asm = match compile(&source) {
    Ok(asm) => asm,
    Err(err) => {
      eprintln!("{}", err.render(&source));
      return ExitCode::FAILURE;
    }
  };
  debug!(instructions = asm.insts.len(), "compiled");

  if cli.run {
    return match vm::run(&asm) {
      Ok(value) => {
        println!("{value}");
        ExitCode::SUCCESS
      }
      Err(err) => {
        eprintln!("execution failed: {err}");
        ExitCode::FAILURE
      }
    };
  }

  let written = match &cli.output {
    Some(path) => File::create(path).and_then(|file| {
      let mut sink = BufWriter::new(file);
      asm.write_to(cli.syntax.into(), &mut sink)?;
      sink.flush()
    }),
    None => {
      let mut sink = io::stdout().lock();
      asm.write_to(cli.syntax.into(), &mut sink)
    }
  };

  if let Err(err) = written {
    eprintln!("cannot write assembly: {err}");
    return ExitCode::FAILURE;
  }
  ExitCode::SUCCESS
}
