//! Check-config command implementation.
//!
//! Loads and validates configuration files without fetching any returns.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use factorlens_core::config::EngineConfig;
use factorlens_ext_file::{TomlLimitSource, TomlProxySource};

use crate::cli::OutputFormat;
use crate::output::{print_header, print_json, print_success, print_table, KeyValue};

/// Arguments for the check-config command.
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Engine configuration (TOML)
    #[arg(short, long, env = "FACTORLENS_CONFIG")]
    pub config: PathBuf,

    /// Risk limits (TOML) to validate alongside
    #[arg(short, long)]
    pub limits: Option<PathBuf>,

    /// Factor proxies (TOML) to validate alongside
    #[arg(short, long)]
    pub proxies: Option<PathBuf>,
}

/// Execute the check-config command.
pub fn execute(args: CheckConfigArgs, format: OutputFormat) -> Result<()> {
    let config = EngineConfig::from_toml_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let scopes = args
        .limits
        .as_ref()
        .map(|path| {
            TomlLimitSource::from_path(path)
                .map(|source| source.scopes())
                .with_context(|| format!("loading {}", path.display()))
        })
        .transpose()?;
    let proxies = args
        .proxies
        .as_ref()
        .map(|path| {
            TomlProxySource::from_path(path)
                .map(|source| source.len())
                .with_context(|| format!("loading {}", path.display()))
        })
        .transpose()?;

    match format {
        OutputFormat::Table => {
            print_header("Engine Configuration");
            print_table(&config_rows(&config));
            if let Some(scopes) = &scopes {
                print_header("Limit Scopes");
                let rows: Vec<KeyValue> = scopes
                    .iter()
                    .map(|scope| KeyValue::new("scope", scope.clone()))
                    .collect();
                print_table(&rows);
            }
            if let Some(count) = proxies {
                println!("\n{count} proxy set(s) configured");
            }
            print_success("Configuration is valid");
        }
        OutputFormat::Json => print_json(&json!({
            "valid": true,
            "config": config,
            "scopes": scopes,
            "proxy_sets": proxies,
        }))?,
    }

    Ok(())
}

fn config_rows(config: &EngineConfig) -> Vec<KeyValue> {
    let max_peers = config
        .data_quality
        .max_peers
        .map_or_else(|| "unlimited".to_string(), |n| n.to_string());
    vec![
        KeyValue::new(
            "data_quality.min_observations",
            config.data_quality.min_observations.to_string(),
        ),
        KeyValue::new("data_quality.max_peers", max_peers),
        KeyValue::new("factors.frequency", config.factors.frequency.to_string()),
        KeyValue::new(
            "factors.excess_style_factors",
            config.factors.excess_style_factors.to_string(),
        ),
        KeyValue::new("factors.cash_tickers", config.factors.cash_tickers.join(", ")),
        KeyValue::new(
            "concurrency.max_concurrent_assets",
            config.concurrency.max_concurrent_assets.to_string(),
        ),
        KeyValue::new(
            "concurrency.provider_timeout_ms",
            config.concurrency.provider_timeout_ms.to_string(),
        ),
        KeyValue::new(
            "optimizer.max_iterations",
            config.optimizer.max_iterations.to_string(),
        ),
        KeyValue::new(
            "optimizer.tolerance",
            format!("{:e}", config.optimizer.tolerance),
        ),
    ]
}
