//! Rollup CLI - benchmark group-by materialization policies
//!
//! Usage:
//!   rollup generate                          populate the dataset table
//!   rollup catalog                           count every grouping and store it
//!   rollup workload [--queries <n>]          sample and store a workload
//!   rollup replay [--capacity <c>]...        compare capacities on the stored workload
//!   rollup run                               all of the above, in order
//!   rollup simulate --catalog <..> --workload <..> --capacity <c>
//!
//! Examples:
//!   rollup run --format json
//!   rollup replay --capacity 2 --capacity 8 --steps
//!   rollup simulate --catalog "A=10,B=100,C=1000" --workload "A,B,C" --capacity 2

use clap::{Parser, Subcommand, ValueEnum};
use rollup::attribute::AttributeUniverse;
use rollup::catalog::{CardinalityCatalog, CatalogEntry, CatalogError};
use rollup::config::{CatalogMode, Settings, SettingsError};
use rollup::experiment::{Experiment, ExperimentError};
use rollup::logging;
use rollup::materialize::{batch_report, BatchReport, CacheError};
use rollup::workload::{Sampling, Workload};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rollup")]
#[command(about = "Rollup - benchmark a workload-driven group-by materialization cache")]
#[command(version)]
struct Cli {
    /// Path to a rollup.toml (defaults to the standard search locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recreate and populate the dataset table
    Generate {
        /// Seed for row generation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Build the cardinality catalog from the dataset table and store it
    Catalog,

    /// Sample a workload of grouping queries and store it
    Workload {
        /// Number of queries to draw
        #[arg(short, long)]
        queries: Option<usize>,

        /// Sampling strategy
        #[arg(long)]
        sampling: Option<SamplingArg>,

        /// Seed for sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Replay the stored workload against one or more capacities
    Replay {
        #[command(flatten)]
        report: ReportArgs,
    },

    /// Generate, build the catalog, sample a workload and replay it
    Run {
        #[command(flatten)]
        report: ReportArgs,
    },

    /// Replay an inline workload against inline cardinalities (no database)
    Simulate {
        /// Cardinalities as CODE=COUNT pairs, e.g. "A=10,AB=1000"
        #[arg(long)]
        catalog: String,

        /// Queries in arrival order, e.g. "AB,A,C,A"
        #[arg(long)]
        workload: String,

        /// Attribute symbols in universe order (defaults to the sorted
        /// symbols used by the catalog)
        #[arg(long)]
        universe: Option<String>,

        #[command(flatten)]
        report: ReportArgs,
    },
}

#[derive(clap::Args)]
struct ReportArgs {
    /// Cache capacity to compare (repeatable; defaults to the config)
    #[arg(long = "capacity")]
    capacities: Vec<usize>,

    /// Print the per-request breakdown
    #[arg(long)]
    steps: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum SamplingArg {
    Distinct,
    Uniform,
}

impl From<SamplingArg> for Sampling {
    fn from(arg: SamplingArg) -> Self {
        match arg {
            SamplingArg::Distinct => Sampling::Distinct,
            SamplingArg::Uniform => Sampling::Uniform,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human readable summary
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Experiment(#[from] ExperimentError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("{0}")]
    Usage(String),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CatalogError> for CliError {
    fn from(err: CatalogError) -> Self {
        Self::Experiment(err.into())
    }
}

impl From<CacheError> for CliError {
    fn from(err: CacheError) -> Self {
        Self::Experiment(err.into())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.config;
    let result = match cli.command {
        Commands::Generate { seed } => load_settings(config).and_then(|s| cmd_generate(s, seed)),
        Commands::Catalog => load_settings(config).and_then(cmd_catalog),
        Commands::Workload {
            queries,
            sampling,
            seed,
        } => load_settings(config).and_then(|s| cmd_workload(s, queries, sampling, seed)),
        Commands::Replay { report } => load_settings(config).and_then(|s| cmd_replay(s, &report)),
        Commands::Run { report } => load_settings(config).and_then(|s| cmd_run(s, &report)),
        Commands::Simulate {
            catalog,
            workload,
            universe,
            report,
        } => cmd_simulate(&catalog, &workload, universe.as_deref(), &report),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings, CliError> {
    let settings = match path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    settings.validate()?;
    Ok(settings)
}

fn cmd_generate(mut settings: Settings, seed: Option<u64>) -> Result<(), CliError> {
    if seed.is_some() {
        settings.dataset.seed = seed;
    }
    let table = settings.dataset.table.clone();
    let mut experiment = Experiment::open(settings)?;
    let rows = experiment.generate()?;
    println!("Generated {} rows into {}", rows, table);
    Ok(())
}

fn cmd_catalog(settings: Settings) -> Result<(), CliError> {
    let mut experiment = Experiment::open(settings)?;
    let workload = match experiment.settings().catalog.mode {
        CatalogMode::Full => None,
        CatalogMode::Workload => Some(
            experiment
                .store()
                .load_workload(experiment.universe())
                .map_err(ExperimentError::from)?
                .ok_or(ExperimentError::MissingWorkload)?,
        ),
    };
    let catalog = experiment.build_catalog(workload.as_ref())?;
    println!("{}", catalog);
    Ok(())
}

fn cmd_workload(
    mut settings: Settings,
    queries: Option<usize>,
    sampling: Option<SamplingArg>,
    seed: Option<u64>,
) -> Result<(), CliError> {
    if let Some(queries) = queries {
        settings.workload.queries = queries;
    }
    if let Some(sampling) = sampling {
        settings.workload.sampling = sampling.into();
    }
    if seed.is_some() {
        settings.workload.seed = seed;
    }

    let mut experiment = Experiment::open(settings)?;
    let workload = experiment.sample_workload()?;
    println!(
        "Workload ({} queries): {}",
        workload.len(),
        workload.codes(experiment.universe()).join(", ")
    );
    Ok(())
}

fn cmd_replay(settings: Settings, args: &ReportArgs) -> Result<(), CliError> {
    let experiment = Experiment::open(settings)?;
    let report = experiment.replay(&args.capacities)?;
    print_report(&report, args)
}

fn cmd_run(mut settings: Settings, args: &ReportArgs) -> Result<(), CliError> {
    if !args.capacities.is_empty() {
        settings.cache.capacities = args.capacities.clone();
    }
    let table = settings.dataset.table.clone();
    let mut experiment = Experiment::open(settings)?;
    let run = experiment.run()?;

    match args.format {
        OutputFormat::Json => {
            let output = RunOutput {
                rows: run.rows,
                catalog: run.catalog.entries(),
                report: &run.report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        OutputFormat::Text => {
            println!("Generated {} rows into {}", run.rows, table);
            println!();
            println!("{}", run.catalog);
            println!();
            print_report(&run.report, args)
        }
    }
}

/// JSON shape of `rollup run`.
#[derive(Serialize)]
struct RunOutput<'a> {
    rows: u64,
    catalog: Vec<CatalogEntry>,
    report: &'a BatchReport,
}

fn cmd_simulate(
    catalog: &str,
    workload: &str,
    universe: Option<&str>,
    args: &ReportArgs,
) -> Result<(), CliError> {
    let pairs = parse_cardinalities(catalog)?;
    let symbols = match universe {
        Some(symbols) => symbols.to_string(),
        None => {
            let mut symbols: Vec<char> = pairs.iter().flat_map(|(code, _)| code.chars()).collect();
            symbols.sort_unstable();
            symbols.dedup();
            symbols.into_iter().collect()
        }
    };
    let universe = AttributeUniverse::from_symbols(&symbols).map_err(CatalogError::from)?;
    let workload = Workload::parse_list(&universe, workload).map_err(ExperimentError::from)?;
    let catalog = CardinalityCatalog::from_codes(
        universe,
        pairs.iter().map(|(code, card)| (code.as_str(), *card)),
    )?;

    let capacities = if args.capacities.is_empty() {
        vec![2]
    } else {
        args.capacities.clone()
    };
    let catalog = Arc::new(catalog);
    let report = batch_report(&catalog, &workload, &capacities)?;
    print_report(&report, args)
}

/// Parse `"A=10, AB=1000"` into `(code, count)` pairs.
fn parse_cardinalities(s: &str) -> Result<Vec<(String, u64)>, CliError> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (code, count) = pair
                .split_once('=')
                .ok_or_else(|| CliError::Usage(format!("expected CODE=COUNT, got \"{}\"", pair)))?;
            let count = count.trim().parse::<u64>().map_err(|_| {
                CliError::Usage(format!("invalid count in \"{}\"", pair))
            })?;
            Ok((code.trim().to_string(), count))
        })
        .collect()
}

fn print_report(report: &BatchReport, args: &ReportArgs) -> Result<(), CliError> {
    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            println!("{}", report);
            if args.steps {
                for run in &report.runs {
                    println!();
                    println!("steps (capacity = {}):", run.capacity);
                    println!("{}", run.steps_table());
                }
            }
        }
    }
    Ok(())
}
