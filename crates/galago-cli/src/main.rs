//! `galago`: concolic path exploration over built-in demo hosts.
//!
//! Instrumenting a real host is out of scope for the engine; the demo
//! subcommands stand in for one, each recording constraints through a
//! session while the explorer derives fresh seeds by suffix negation. The
//! session report is printed as JSON to stdout or written to `--out`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use galago_engine::explorer::{explore, ExploreError, ExploreOptions, HostError};
use galago_engine::report::SessionReport;
use galago_expr::eval::{Assignment, Value};
use galago_runtime::path_condition::PathCondition;
use galago_runtime::recorder::CmpKind;
use galago_runtime::session::{RecorderConfig, Session};
use galago_runtime::tag::Tag;

#[derive(Parser)]
#[command(name = "galago")]
#[command(about = "Concolic path exploration over built-in demo hosts")]
#[command(version)]
struct Cli {
    /// Hard upper bound on host executions
    #[arg(long, global = true, default_value_t = 100)]
    max_iterations: u32,

    /// Solver scan window per variable
    #[arg(long, global = true, default_value_t = 1000)]
    search_width: u32,

    /// Emit per-event recorder diagnostics (with RUST_LOG=debug)
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    /// Disable constraint interception entirely
    #[arg(long, global = true, default_value_t = false)]
    no_interception: bool,

    /// Recorder reentrancy bound
    #[arg(long, global = true, default_value_t = 10)]
    max_recursion_depth: u32,

    /// Write the session report to a file instead of stdout
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore an N-way select driven by a symbolic choice
    Switch {
        /// Number of switch cases
        #[arg(long, default_value_t = 5)]
        cases: u32,

        /// Initial seed for the choice variable
        #[arg(long, default_value_t = 0)]
        seed: i64,
    },
    /// Explore a single threshold branch (`x > threshold`)
    Branch {
        /// Branch threshold
        #[arg(long, default_value_t = 10)]
        threshold: i64,

        /// Initial seed for x
        #[arg(long, default_value_t = 0)]
        seed: i64,
    },
    /// Explore a half-open range check (`low <= x < high`)
    Range {
        /// Inclusive lower bound
        #[arg(long, default_value_t = 0)]
        low: i64,

        /// Exclusive upper bound
        #[arg(long, default_value_t = 100)]
        high: i64,

        /// Initial seed for x
        #[arg(long, default_value_t = 0)]
        seed: i64,
    },
}

#[derive(Debug)]
enum CliError {
    Config(String),
    Solver(String),
    Host(String),
    Io(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Io(_) => 1,
            CliError::Config(_) => 2,
            CliError::Solver(_) => 3,
            CliError::Host(_) => 4,
        }
    }

    fn message(&self) -> String {
        match self {
            CliError::Config(message) => format!("invalid configuration: {message}"),
            CliError::Solver(message) => format!("solver error: {message}"),
            CliError::Host(message) => format!("host execution error: {message}"),
            CliError::Io(message) => message.clone(),
        }
    }
}

impl From<ExploreError> for CliError {
    fn from(err: ExploreError) -> Self {
        match err {
            ExploreError::InvalidConfig(message) => CliError::Config(message),
            ExploreError::Solver(source) => CliError::Solver(source.to_string()),
            ExploreError::Host { message, .. } => CliError::Host(message),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", miette::Report::msg(err.message()));
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let session = Session::with_config(RecorderConfig {
        interception_enabled: !cli.no_interception,
        debug: cli.debug,
        max_recursion_depth: cli.max_recursion_depth,
    });
    let options = ExploreOptions {
        max_iterations: cli.max_iterations,
        search_width: cli.search_width,
        ..ExploreOptions::default()
    };

    let report = match &cli.command {
        Commands::Switch { cases, seed } => {
            if *cases == 0 || *cases > i32::MAX as u32 {
                return Err(CliError::Config(format!(
                    "cases must be between 1 and {}, got {cases}",
                    i32::MAX
                )));
            }
            let cases = *cases;
            explore(
                initial_seeds("choice", *seed),
                |assignment| switch_host(&session, assignment, cases),
                &options,
            )
        }
        Commands::Branch { threshold, seed } => {
            let threshold = *threshold;
            explore(
                initial_seeds("x", *seed),
                |assignment| branch_host(&session, assignment, threshold),
                &options,
            )
        }
        Commands::Range { low, high, seed } => {
            if low >= high {
                return Err(CliError::Config(format!(
                    "low ({low}) must be less than high ({high})"
                )));
            }
            let (low, high) = (*low, *high);
            explore(
                initial_seeds("x", *seed),
                |assignment| range_host(&session, assignment, low, high),
                &options,
            )
        }
    }
    .map_err(CliError::from)?;

    let document = SessionReport::from_exploration(&report);
    let json = document
        .to_json_pretty()
        .map_err(|err| CliError::Io(err.to_string()))?;
    match &cli.out {
        Some(path) => std::fs::write(path, json + "\n")
            .map_err(|err| CliError::Io(format!("cannot write {}: {err}", path.display())))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn initial_seeds(name: &str, seed: i64) -> Assignment {
    let mut seeds = Assignment::new();
    seeds.insert(name.to_string(), Value::Int(seed));
    seeds
}

fn int_seed(assignment: &Assignment, name: &str) -> Result<i64, HostError> {
    assignment
        .get(name)
        .and_then(Value::as_int)
        .ok_or_else(|| HostError::from(format!("missing integer seed '{name}'")))
}

fn symbolic_int(session: &Session, name: &str, seed: i64) -> Result<Tag, HostError> {
    session
        .make_symbolic_int(name, seed)
        .map_err(|err| HostError::from(err.to_string()))
}

fn switch_host(
    session: &Session,
    assignment: &Assignment,
    cases: u32,
) -> Result<PathCondition, HostError> {
    let choice = int_seed(assignment, "choice")?;
    let tag = symbolic_int(session, "choice", choice)?;
    let arm = if choice >= 0 && choice < i64::from(cases) {
        choice as i32
    } else {
        -1
    };
    session.switch_case(&tag, arm);
    Ok(session.flush())
}

fn branch_host(
    session: &Session,
    assignment: &Assignment,
    threshold: i64,
) -> Result<PathCondition, HostError> {
    let x = int_seed(assignment, "x")?;
    let tag = symbolic_int(session, "x", x)?;
    session.icmp_jump(x, threshold, &tag, &Tag::empty(), CmpKind::Gt);
    Ok(session.flush())
}

fn range_host(
    session: &Session,
    assignment: &Assignment,
    low: i64,
    high: i64,
) -> Result<PathCondition, HostError> {
    let x = int_seed(assignment, "x")?;
    let tag = symbolic_int(session, "x", x)?;
    if session.icmp_jump(x, low, &tag, &Tag::empty(), CmpKind::Ge) {
        session.icmp_jump(x, high, &tag, &Tag::empty(), CmpKind::Lt);
    }
    Ok(session.flush())
}
