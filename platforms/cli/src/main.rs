//! Command-line runner: compiles a machine description, loads an input word and
//! steps the machine until it halts.
//!
//! Exit codes: 0 when the word is accepted, 1 when it is rejected, 2 when the program
//! cannot be read or compiled.

use clap::{Parser, ValueEnum};
use fita::{
    analyze, compile, render, FitaError, Machine, ProgramLoader, ProgramManager, Snapshot,
    Status, Variant,
};
use std::path::Path;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::warn;

#[derive(Parser)]
#[command(name = "fita-cli")]
#[command(author, version, about = "Deterministic Turing machine simulator", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// The machine description file (.mt) to execute
    #[arg(short, long)]
    program: Option<String>,

    /// The input word loaded on the first tape
    #[arg(short, long, default_value = "")]
    input: String,

    /// Print a snapshot after every step
    #[arg(short, long)]
    trace: bool,

    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,

    /// Milliseconds to wait between steps
    #[arg(short, long, default_value = "0")]
    delay: u64,

    /// Engine variant (defaults to left-bounded for one tape, left-infinite otherwise)
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Report lint warnings before running
    #[arg(short, long)]
    lint: bool,

    /// Print the program re-rendered from its compiled form and exit
    #[arg(short, long)]
    render: bool,

    /// List the bundled sample programs and exit
    #[arg(long)]
    list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    LeftBounded,
    LeftInfinite,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::LeftBounded => Variant::LeftBounded,
            VariantArg::LeftInfinite => Variant::LeftInfinite,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, FitaError> {
    if cli.list {
        list(cli.json);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(path) = cli.program else {
        return Err(FitaError::ValidationError(
            "no program given, pass --program or --list".to_string(),
        ));
    };

    let text = ProgramLoader::read_program(Path::new(&path))?;
    let config = compile(&text)?;

    if cli.lint {
        for warning in analyze(&config) {
            eprintln!("warning: {warning}");
        }
    }

    if cli.render {
        print!("{}", render(&config, &text));
        return Ok(ExitCode::SUCCESS);
    }

    let mut machine = match cli.variant {
        Some(variant) => Machine::with_variant(config, variant.into())?,
        None => Machine::new(config)?,
    };

    if cli.trace {
        let json = cli.json;
        machine.subscribe(move |snapshot: &Snapshot| print_snapshot(snapshot, json));
    }

    machine.reset(&cli.input)?;

    let delay = Duration::from_millis(cli.delay);
    while !machine.is_halted() {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        machine.step();
    }

    let snapshot = machine.snapshot();
    if !cli.trace {
        print_snapshot(&snapshot, cli.json);
    }
    if !cli.json {
        print_summary(&snapshot);
    }

    Ok(match snapshot.status {
        Status::Accepted => ExitCode::SUCCESS,
        _ => ExitCode::from(1),
    })
}

fn list(json: bool) {
    for index in 0..ProgramManager::get_program_count() {
        let Ok(info) = ProgramManager::get_program_info(index) else {
            continue;
        };

        if json {
            match serde_json::to_string(&info) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "cannot serialize program info"),
            }
        } else {
            println!(
                "{:>2}  {:<16} {} tape(s), {} states, {} transitions",
                info.index, info.name, info.tape_count, info.state_count, info.transition_count
            );
        }
    }
}

fn print_snapshot(snapshot: &Snapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "cannot serialize snapshot"),
        }
        return;
    }

    let next = snapshot
        .transition
        .map_or_else(|| "-".to_string(), |i| i.to_string());
    println!(
        "step {} | state {} | next transition {}",
        snapshot.step_count, snapshot.state, next
    );

    for (i, tape) in snapshot.tapes.iter().enumerate() {
        println!("  {tape}");
        if let Some(index) = snapshot.head_index(i).filter(|index| *index >= 0) {
            println!("  {:>width$}", "^", width = index as usize + 1);
        }
    }
}

fn print_summary(snapshot: &Snapshot) {
    let verdict = match snapshot.status {
        Status::Accepted => "ACCEPTED",
        Status::Rejected => "REJECTED",
        Status::Running => "RUNNING",
    };

    match snapshot.halt_reason {
        Some(reason) if snapshot.rejected() => println!(
            "{verdict} ({reason:?}) after {} steps in state {}",
            snapshot.step_count, snapshot.state
        ),
        _ => println!(
            "{verdict} after {} steps in state {}",
            snapshot.step_count, snapshot.state
        ),
    }
}
