//! CLI command implementations.

pub mod analyze;
pub mod check_config;
pub mod optimize;

pub use analyze::AnalyzeArgs;
pub use check_config::CheckConfigArgs;
pub use optimize::OptimizeArgs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use tracing::debug;

use factorlens_core::config::EngineConfig;
use factorlens_core::types::{AnalysisWindow, Holding, RiskLimitSet};
use factorlens_engine::{RiskEngine, RiskEngineBuilder};
use factorlens_ext_file::{load_holdings_csv, CsvReturnProvider, TomlLimitSource, TomlProxySource};

use crate::error::{CliError, CliResult};

/// File inputs shared by `analyze` and `optimize`.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Engine configuration (TOML)
    #[arg(short, long, env = "FACTORLENS_CONFIG")]
    pub config: PathBuf,

    /// Period returns (CSV: ticker,date,return)
    #[arg(short, long)]
    pub returns: PathBuf,

    /// Factor proxies (TOML, [proxies.<TICKER>] tables)
    #[arg(short, long)]
    pub proxies: PathBuf,

    /// Risk limits (TOML, [scopes.<id>] tables)
    #[arg(short, long)]
    pub limits: Option<PathBuf>,

    /// Holdings (CSV: ticker,weight[,dollar_exposure])
    #[arg(long)]
    pub holdings: PathBuf,

    /// Limit scope to check against
    #[arg(short, long, default_value = "default")]
    pub scope: String,

    /// First day of the analysis window (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Last day of the analysis window (YYYY-MM-DD)
    #[arg(long)]
    pub end: String,
}

/// Everything a command needs from its inputs.
pub struct Session {
    pub engine: RiskEngine,
    pub holdings: Vec<Holding>,
    pub window: AnalysisWindow,
    pub limits: RiskLimitSet,
}

impl InputArgs {
    /// Loads every file and builds the engine.
    pub async fn load(&self) -> Result<Session> {
        let config = EngineConfig::from_toml_file(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        let window = AnalysisWindow::new(parse_date(&self.start)?, parse_date(&self.end)?)?;

        let returns = CsvReturnProvider::from_path(&self.returns, config.factors.frequency)?;
        let proxies = TomlProxySource::from_path(&self.proxies)?;
        let holdings = load_holdings_csv(&self.holdings)?;
        debug!(
            tickers = returns.tickers().len(),
            proxies = proxies.len(),
            holdings = holdings.len(),
            "inputs loaded"
        );

        let mut builder = RiskEngineBuilder::new()
            .with_config(config)
            .with_returns(returns)
            .with_proxies(proxies);
        if let Some(path) = &self.limits {
            builder = builder.with_limits(TomlLimitSource::from_path(path)?);
        }
        let engine = builder.build()?;

        let limits = if self.limits.is_some() {
            engine.limits(&self.scope).await?
        } else {
            RiskLimitSet::new()
        };

        Ok(Session {
            engine,
            holdings,
            window,
            limits,
        })
    }
}

/// Parses a date string in YYYY-MM-DD format.
pub fn parse_date(s: &str) -> CliResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CliError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2021-06-30").unwrap(),
            NaiveDate::from_ymd_opt(2021, 6, 30).unwrap()
        );
        assert!(matches!(
            parse_date("06/30/2021"),
            Err(CliError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_missing_input_names_objective_and_flag() {
        let err = CliError::MissingInput {
            objective: "max-return",
            flag: "--expected-returns",
        };
        assert_eq!(
            err.to_string(),
            "objective `max-return` requires --expected-returns"
        );
    }
}
