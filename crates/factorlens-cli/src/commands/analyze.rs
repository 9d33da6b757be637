//! Analyze command implementation.
//!
//! Fits factor models for every holding and prints the risk decomposition
//! and limit checks.

use anyhow::Result;
use clap::Args;
use tabled::Tabled;

use factorlens_engine::RiskAnalysis;

use crate::cli::OutputFormat;
use crate::commands::InputArgs;
use crate::output::{pct, print_checks, print_header, print_json, print_table, print_warning, KeyValue};

/// Arguments for the analyze command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
}

/// Execute the analyze command.
pub async fn execute(args: AnalyzeArgs, format: OutputFormat) -> Result<()> {
    let session = args.inputs.load().await?;
    let analysis = session
        .engine
        .analyze(&session.holdings, &session.window, &session.limits)
        .await?;

    match format {
        OutputFormat::Table => print_analysis(&analysis),
        OutputFormat::Json => {
            let mut wire = analysis.to_wire();
            wire["dropped_peers"] = serde_json::to_value(&analysis.fitted.dropped_peers)?;
            print_json(&wire)?;
        }
    }

    Ok(())
}

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Risk Contrib")]
    risk_contribution: String,
    #[tabled(rename = "% of Variance")]
    share: String,
    #[tabled(rename = "R²")]
    r_squared: String,
}

#[derive(Tabled)]
struct FactorRow {
    #[tabled(rename = "Factor")]
    factor: String,
    #[tabled(rename = "Portfolio Beta")]
    beta: String,
    #[tabled(rename = "Variance Contrib")]
    contribution: String,
}

fn print_analysis(analysis: &RiskAnalysis) {
    let summary = &analysis.summary;

    print_header(&format!("Portfolio Risk ({})", analysis.window));
    print_table(&[
        KeyValue::from_percent("Volatility", summary.volatility),
        KeyValue::new("Total Variance", format!("{:.6}", summary.total_variance)),
        KeyValue::from_percent("Factor Share", summary.factor_share()),
        KeyValue::from_percent("Gross Exposure", summary.gross_exposure),
        KeyValue::from_percent("Net Exposure", summary.net_exposure),
        KeyValue::new("Herfindahl", format!("{:.4}", summary.herfindahl)),
    ]);

    print_header("Positions");
    let rows: Vec<PositionRow> = summary
        .positions
        .iter()
        .zip(&analysis.fitted.models)
        .map(|(position, model)| PositionRow {
            ticker: position.ticker.clone(),
            weight: pct(position.weight),
            risk_contribution: pct(position.risk_contribution),
            share: pct(position.share_of_variance),
            r_squared: if model.betas.is_empty() {
                "-".to_string()
            } else {
                format!("{:.3}", model.r_squared)
            },
        })
        .collect();
    print_table(&rows);

    print_header("Factors");
    let rows: Vec<FactorRow> = summary
        .factor_contributions
        .iter()
        .map(|(factor, contribution)| FactorRow {
            factor: factor.to_string(),
            beta: format!(
                "{:.3}",
                summary.portfolio_betas.get(factor).copied().unwrap_or(0.0)
            ),
            contribution: format!("{contribution:.6}"),
        })
        .collect();
    print_table(&rows);

    for (ticker, dropped) in &analysis.fitted.dropped_peers {
        let peers: Vec<&str> = dropped.iter().map(|p| p.ticker.as_str()).collect();
        print_warning(&format!(
            "{ticker}: peers dropped for insufficient history: {}",
            peers.join(", ")
        ));
    }

    print_checks(&analysis.checks);
}
