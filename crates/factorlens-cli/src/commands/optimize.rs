//! Optimize command implementation.
//!
//! Solves for weights over the current holdings under the scope's limits.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tabled::Tabled;

use factorlens_core::types::Holding;
use factorlens_engine::OptimizationRequest;
use factorlens_ext_file::load_expected_returns_csv;
use factorlens_optimizer::prelude::{Objective, OptimizationResult, WeightBounds, WeightScaling};

use crate::cli::OutputFormat;
use crate::commands::InputArgs;
use crate::error::CliError;
use crate::output::{pct, print_checks, print_header, print_json, print_table, KeyValue};

/// Objective choices on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectiveArg {
    /// Minimize portfolio variance
    MinVariance,
    /// Maximize expected return
    MaxReturn,
}

/// Arguments for the optimize command.
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// What to optimize
    #[arg(long, value_enum, default_value = "min-variance")]
    pub objective: ObjectiveArg,

    /// Expected returns (CSV: ticker,expected_return); required for max-return
    #[arg(long)]
    pub expected_returns: Option<PathBuf>,

    /// Lower bound on every weight
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pub lower: f64,

    /// Upper bound on every weight
    #[arg(long, default_value = "1.0")]
    pub upper: f64,

    /// Rescale solved weights to the input net exposure
    #[arg(long)]
    pub original_scale: bool,
}

impl OptimizeArgs {
    fn objective(&self) -> Result<Objective> {
        match self.objective {
            ObjectiveArg::MinVariance => Ok(Objective::MinVariance),
            ObjectiveArg::MaxReturn => {
                let path = self
                    .expected_returns
                    .as_ref()
                    .ok_or_else(|| CliError::MissingInput {
                        objective: "max-return",
                        flag: "--expected-returns",
                    })?;
                Ok(Objective::max_return(load_expected_returns_csv(path)?))
            }
        }
    }
}

/// Execute the optimize command.
pub async fn execute(args: OptimizeArgs, format: OutputFormat) -> Result<()> {
    let objective = args.objective()?;
    let bounds = WeightBounds::new(args.lower, args.upper);
    bounds.validate()?;
    let scaling = if args.original_scale {
        WeightScaling::Original
    } else {
        WeightScaling::Normalized
    };

    let session = args.inputs.load().await?;
    let request = OptimizationRequest::new(objective, session.holdings.clone(), session.window)
        .with_limits(session.limits)
        .with_bounds(bounds)
        .with_scaling(scaling);
    let result = session.engine.optimize(request).await?;

    match format {
        OutputFormat::Table => print_result(&result, &session.holdings),
        OutputFormat::Json => print_json(&result)?,
    }

    // Infeasible and unfinished runs exit non-zero once reported.
    result.into_result()?;
    Ok(())
}

#[derive(Tabled)]
struct WeightRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Optimized")]
    optimized: String,
    #[tabled(rename = "Change")]
    change: String,
}

fn print_result(result: &OptimizationResult, current: &[Holding]) {
    print_header(&format!("Optimization ({})", result.objective));
    let mut rows = vec![
        KeyValue::new("Status", result.status.to_string()),
        KeyValue::new("Iterations", result.diagnostics.iterations.to_string()),
        KeyValue::new("Penalty Rounds", result.diagnostics.penalty_rounds.to_string()),
        KeyValue::new(
            "Max Violation",
            format!("{:.2e}", result.diagnostics.max_violation),
        ),
    ];
    if let Some(value) = result.objective_value {
        rows.push(KeyValue::new("Objective", format!("{value:.6}")));
    }
    if let Some(summary) = &result.summary {
        rows.push(KeyValue::from_percent("Volatility", summary.volatility));
    }
    print_table(&rows);

    print_header("Weights");
    let rows: Vec<WeightRow> = current
        .iter()
        .map(|holding| {
            let solved = result.weight(&holding.ticker).unwrap_or(0.0);
            WeightRow {
                ticker: holding.ticker.clone(),
                current: pct(holding.weight),
                optimized: pct(solved),
                change: pct(solved - holding.weight),
            }
        })
        .collect();
    print_table(&rows);

    print_checks(&result.checks);
}
