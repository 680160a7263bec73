// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! `premia` command line front end.
//!
//! ```text
//! premia solve book.txt --config solver.toml --json
//! premia solve book.txt --time-limit 10 --pin policy-7=0
//! premia inspect book.txt
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` or `-v`.

use clap::{Args, Parser, Subcommand};
use premia_model::{
    loading::{InstanceLoader, LoadError},
    model::Instance,
};
use premia_search::result::SolverResult;
use premia_solver::{
    config::{BounderKind, BranchingKind, ConfigError, SolverConfig},
    decompose::Components,
    report::SolutionReport,
    solver::{SolveError, SolverBuilder, resolve_pin},
};
use std::{path::PathBuf, process::ExitCode};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to load instance: {0}")]
    Load(#[from] LoadError),

    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Solve(#[from] SolveError),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Parser)]
#[command(name = "premia", version, about = "Constrained multiple-choice selection engine")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve an instance and print the selection.
    Solve(SolveArgs),
    /// Validate an instance and print its structure.
    Inspect(InstanceArgs),
}

#[derive(Debug, Args)]
struct InstanceArgs {
    /// Instance file in the line-oriented text format.
    instance: PathBuf,

    /// Risk threshold for entities without a `threshold` line.
    #[arg(long, value_name = "RISK")]
    default_threshold: Option<f64>,
}

#[derive(Debug, Args)]
struct SolveArgs {
    #[command(flatten)]
    input: InstanceArgs,

    /// Solver configuration (TOML).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Wall-clock limit in seconds; overrides the configuration.
    #[arg(long, value_name = "SECS")]
    time_limit: Option<f64>,

    /// Node budget; overrides the configuration.
    #[arg(long, value_name = "NODES")]
    node_limit: Option<u64>,

    #[arg(long, value_enum)]
    bounder: Option<BounderArg>,

    #[arg(long, value_enum)]
    branching: Option<BranchingArg>,

    /// Worker threads; 1 solves components sequentially.
    #[arg(long)]
    threads: Option<usize>,

    /// Pin an entity to an option before solving. Repeatable.
    #[arg(long = "pin", value_name = "ENTITY=OPTION", value_parser = parse_pin)]
    pins: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum BounderArg {
    Knapsack,
    Independent,
}

impl From<BounderArg> for BounderKind {
    fn from(arg: BounderArg) -> Self {
        match arg {
            BounderArg::Knapsack => BounderKind::Knapsack,
            BounderArg::Independent => BounderKind::Independent,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum BranchingArg {
    Declaration,
    MostConstrained,
}

impl From<BranchingArg> for BranchingKind {
    fn from(arg: BranchingArg) -> Self {
        match arg {
            BranchingArg::Declaration => BranchingKind::Declaration,
            BranchingArg::MostConstrained => BranchingKind::MostConstrained,
        }
    }
}

fn parse_pin(s: &str) -> Result<(String, usize), String> {
    let (entity, option) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected ENTITY=OPTION, got `{s}`"))?;
    if entity.is_empty() {
        return Err(format!("missing entity in `{s}`"));
    }
    let option = option
        .parse::<usize>()
        .map_err(|e| format!("invalid option index `{option}`: {e}"))?;
    Ok((entity.to_string(), option))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_instance(args: &InstanceArgs) -> Result<Instance<f64>, CliError> {
    let mut loader = InstanceLoader::<f64>::new();
    if let Some(threshold) = args.default_threshold {
        loader = loader.default_threshold(threshold);
    }
    Ok(loader.from_path(&args.instance)?)
}

fn build_config(args: &SolveArgs) -> Result<SolverConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => SolverConfig::load(path)?,
        None => SolverConfig::default(),
    };
    if let Some(secs) = args.time_limit {
        config = config.with_time_limit_secs(secs);
    }
    if let Some(limit) = args.node_limit {
        config = config.with_node_limit(limit);
    }
    if let Some(bounder) = args.bounder {
        config = config.with_bounder(bounder.into());
    }
    if let Some(branching) = args.branching {
        config = config.with_branching(branching.into());
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads).with_parallel(threads > 1);
    }
    config.validate()?;
    Ok(config)
}

/// Exit status: 0 with a selection, 2 when infeasible, 3 when unknown.
fn solve(args: &SolveArgs) -> Result<u8, CliError> {
    let config = build_config(args)?;
    let instance = load_instance(&args.input)?;
    let pins = args
        .pins
        .iter()
        .map(|(entity, option)| resolve_pin(&instance, entity, *option))
        .collect::<Result<Vec<_>, _>>()?;

    let solver = SolverBuilder::from_config(&config).build();
    let outcome = solver.solve_with_fixed(&instance, &pins)?;
    let report = SolutionReport::new(&instance, &outcome);

    if args.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print!("{}", report);
    }

    Ok(match outcome.result {
        SolverResult::Optimal(_) | SolverResult::Suboptimal(_) => 0,
        SolverResult::Infeasible => 2,
        SolverResult::Unknown => 3,
    })
}

fn inspect(args: &InstanceArgs) -> Result<u8, CliError> {
    let instance = load_instance(args)?;
    let components = Components::compute(&instance);
    print!("{}", instance);
    println!("Components: {}", components.len());
    println!("Largest Component: {}", components.largest());
    println!("Search Space: {}", instance.complexity());
    Ok(0)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Solve(args) => solve(args),
        Command::Inspect(args) => inspect(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(event = "cli_error", error = %err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
