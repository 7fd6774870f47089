use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "rs@md CLI - Tools for preparing and inspecting reactive-step simulations (reactive steps @ molecular dynamics).",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output; command failures are still reported
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a documented example reaction file.
    Example(ExampleArgs),
    /// Validate a simulation configuration and the reaction templates it references.
    Check(CheckArgs),
    /// Search topology snapshots for reaction candidates without reacting them.
    Search(SearchArgs),
}

/// Arguments for the `example` subcommand.
#[derive(Args, Debug)]
pub struct ExampleArgs {
    /// Write the example to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Configuration file and overrides shared by the commands that need a simulation setup.
#[derive(Args, Debug, Clone)]
pub struct SimulationArgs {
    /// Path to the simulation configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the number of cycles from the config file.
    #[arg(short = 'n', long, value_name = "INT")]
    pub cycles: Option<usize>,

    /// Override the random seed from the config file (0 draws a seed from the system).
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Add a reaction file to the ones listed in the config file.
    /// Can be used multiple times.
    #[arg(short, long = "reaction", value_name = "PATH")]
    pub reactions: Vec<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S reaction.temperature=350
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub simulation: SimulationArgs,
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub simulation: SimulationArgs,

    /// Topology snapshots to search, treated as consecutive cycles.
    #[arg(required = true, value_name = "SNAPSHOT")]
    pub snapshots: Vec<PathBuf>,
}
