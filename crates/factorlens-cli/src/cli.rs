//! CLI argument definitions.

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::{AnalyzeArgs, CheckConfigArgs, OptimizeArgs};

/// factorlens - factor-based portfolio risk decomposition and optimization
#[derive(Parser)]
#[command(name = "factorlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fit factor models and decompose portfolio risk
    Analyze(AnalyzeArgs),

    /// Solve for weights under risk limits
    Optimize(OptimizeArgs),

    /// Validate an engine config and optional limit and proxy files
    CheckConfig(CheckConfigArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Table,
    /// JSON document
    Json,
}
