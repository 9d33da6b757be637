//! # factorlens Engine
//!
//! Orchestrates a risk run end to end:
//!
//! ```text
//! ProxySource ─┐
//!              ├─> per-holding fit (JoinSet, bounded) ─> FactorCovariance
//! ReturnProvider ┘                                          │
//!                                                           ├─> Aggregator ─> Limit checks
//!                                                           └─> Optimizer (blocking thread)
//! ```
//!
//! Holdings are fitted concurrently, at most
//! `ConcurrencyConfig::max_concurrent_assets` at a time. The first failure
//! aborts the rest. Each provider call is bounded by
//! `ConcurrencyConfig::provider_timeout_ms`; a timeout is `DataUnavailable`.
//! Within a run every (ticker, window) is fetched at most once.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = RiskEngineBuilder::new()
//!     .with_config(EngineConfig::from_toml_file("engine.toml")?)
//!     .with_returns(CsvReturnProvider::from_path("returns.csv")?)
//!     .with_proxies(TomlProxySource::from_path("proxies.toml")?)
//!     .with_limits(TomlLimitSource::from_path("limits.toml")?)
//!     .build()?;
//!
//! let analysis = engine.analyze_scope(&holdings, &window, "default").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod engine;
pub mod error;

mod cache;
mod fitting;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::RiskEngineBuilder;
    pub use crate::engine::{OptimizationRequest, RiskAnalysis, RiskEngine};
    pub use crate::fitting::FittedPortfolio;
}

pub use builder::RiskEngineBuilder;
pub use engine::{OptimizationRequest, RiskAnalysis, RiskEngine};
pub use fitting::FittedPortfolio;
