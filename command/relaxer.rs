//! Read a grounded Datalog task, run one named transformation over it,
//! and print the result: the rewritten task, or the artifact of an
//! output pass (PDDL domain or problem, MiniZinc program).

use std::fs::read_to_string;
use std::io::{stdin, Read};
use std::process::exit;

use anyhow::{Context as _, Result};
use atty::Stream;
use clap::{Parser, ValueEnum};

use relaxer_emit::{domain, linear_program, problem};
use relaxer_syntax::DatalogParser;
use relaxer_tracer::Trace;
use relaxer_transform::{Pass, Pipeline};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Level {
    Parse,
    Filter,
    Join,
    Rewrite,
    Emit,
    All,
}

impl From<Level> for Trace {
    fn from(level: Level) -> Self {
        match level {
            Level::Parse => Trace::Parse,
            Level::Filter => Trace::Filter,
            Level::Join => Trace::Join,
            Level::Rewrite => Trace::Rewrite,
            Level::Emit => Trace::Emit,
            Level::All => Trace::everything(),
        }
    }
}

#[derive(Parser)]
#[command(name = "relaxer", version, about = "Rewrite a grounded Datalog task")]
struct Args {
    /// The transformation to run.
    pass: Option<String>,

    /// Report decisions on stderr (repeatable).
    #[arg(long, value_enum)]
    trace: Vec<Level>,

    /// Read the task from a file instead of stdin.
    #[arg(short, long)]
    input: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let Some(pass) = args.pass.as_deref().and_then(|name| name.parse::<Pass>().ok()) else {
        usage();
    };
    let trace = args
        .trace
        .iter()
        .fold(Trace::none(), |trace, &level| trace | Trace::from(level));

    if args.input.is_none() && atty::is(Stream::Stdin) {
        eprintln!("Reading a Datalog task from stdin, terminate with Ctrl-D.");
    }
    let input = read_file(args.input.as_deref())?;
    let mut task = DatalogParser::new(trace)
        .parse(&input)
        .context("Parsing the task")?;
    Pipeline::new([pass])
        .run(&mut task, trace)
        .with_context(|| format!("Running `{pass}`"))?;

    let output = match pass {
        Pass::PrintDomain => domain(&task, trace)?,
        Pass::PrintProblem => problem(&task, trace)?,
        Pass::MinizincConstraints => linear_program(&task, trace)?,
        _ => task.to_string(),
    };
    print!("{output}");
    Ok(())
}

fn usage() -> ! {
    eprintln!("Please provide exactly one of the following args defining the transformation:");
    for pass in Pass::ALL {
        eprintln!(" - {pass}");
    }
    eprintln!("The Datalog file is read from stdin.");
    exit(1)
}

/// Read a file or standard input and return the content as a string.
fn read_file(filename: Option<&str>) -> Result<String> {
    match filename {
        None | Some("-") => {
            let mut buffer = String::new();
            stdin()
                .read_to_string(&mut buffer)
                .context("Reading from stdin")?;
            Ok(buffer)
        }
        Some(filename) => read_to_string(filename).with_context(|| format!("Reading {filename}")),
    }
}
