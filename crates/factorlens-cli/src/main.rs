//! factorlens CLI - portfolio risk from files.
//!
//! # Usage
//!
//! ```bash
//! # Decompose risk and check the "default" limit scope
//! factorlens analyze --config engine.toml --returns returns.csv \
//!     --proxies proxies.toml --holdings holdings.csv \
//!     --limits limits.toml --start 2021-01-01 --end 2023-12-31
//!
//! # Minimum-variance weights under the same limits
//! factorlens optimize --objective min-variance ... --upper 0.4
//!
//! # Validate configuration files
//! factorlens check-config --config engine.toml --limits limits.toml
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "factorlens=debug"
    } else {
        "factorlens=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // stdout carries the report
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.format;
    match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(args, format).await?,
        Commands::Optimize(args) => commands::optimize::execute(args, format).await?,
        Commands::CheckConfig(args) => commands::check_config::execute(args, format)?,
    }

    Ok(())
}
