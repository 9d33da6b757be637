//! Engine configuration.
//!
//! [`EngineConfig`] is threaded explicitly through every entry point; the
//! engine never falls back to process-wide defaults. The `Default` impls are
//! documented starting values for the calling layer, and every field can be
//! overridden from TOML:
//!
//! ```toml
//! [data_quality]
//! min_observations = 24
//! max_peers = 5
//!
//! [factors]
//! frequency = "monthly"
//! cash_tickers = ["CASH", "USD"]
//!
//! [concurrency]
//! max_concurrent_assets = 4
//! provider_timeout_ms = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{RiskError, RiskResult};
use crate::types::Frequency;

/// Data-quality thresholds applied before any regression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataQualityConfig {
    /// Minimum aligned observations for a target or a factor estimate.
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,

    /// Keep at most this many peers after filtering (first N in caller order).
    #[serde(default)]
    pub max_peers: Option<usize>,
}

fn default_min_observations() -> usize {
    12
}

impl Default for DataQualityConfig {
    fn default() -> Self {
        Self {
            min_observations: default_min_observations(),
            max_peers: None,
        }
    }
}

/// How factor returns are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactorConfig {
    /// Measure momentum and value as proxy return minus market return.
    #[serde(default = "default_true")]
    pub excess_style_factors: bool,

    /// Tickers treated as cash regardless of their proxy configuration.
    #[serde(default)]
    pub cash_tickers: Vec<String>,

    /// Frequency of the return series requested from the provider.
    #[serde(default)]
    pub frequency: Frequency,
}

fn default_true() -> bool {
    true
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            excess_style_factors: true,
            cash_tickers: Vec::new(),
            frequency: Frequency::default(),
        }
    }
}

impl FactorConfig {
    /// Returns true if `ticker` is configured as cash.
    pub fn is_cash_ticker(&self, ticker: &str) -> bool {
        self.cash_tickers.iter().any(|t| t.eq_ignore_ascii_case(ticker))
    }
}

/// Bounds on concurrent provider work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcurrencyConfig {
    /// Holdings fitted concurrently.
    #[serde(default = "default_max_concurrent_assets")]
    pub max_concurrent_assets: usize,

    /// Timeout for a single provider call, in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
}

fn default_max_concurrent_assets() -> usize {
    8
}

fn default_provider_timeout_ms() -> u64 {
    30_000
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_assets: default_max_concurrent_assets(),
            provider_timeout_ms: default_provider_timeout_ms(),
        }
    }
}

impl ConcurrencyConfig {
    /// Provider timeout as a `Duration`.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

/// Aggregation parallelism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregationConfig {
    /// Enable parallel aggregation (requires the `parallel` feature).
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Minimum holdings count to aggregate in parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_parallel_threshold() -> usize {
    256
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

/// Optimizer iteration and penalty settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Total descent iterations across all penalty rounds.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Projected-gradient convergence tolerance.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Largest constraint violation accepted as feasible.
    #[serde(default = "default_feasibility_tolerance")]
    pub feasibility_tolerance: f64,

    /// Penalty weight of the first round.
    #[serde(default = "default_initial_penalty")]
    pub initial_penalty: f64,

    /// Multiplier applied to the penalty weight between rounds.
    #[serde(default = "default_penalty_growth")]
    pub penalty_growth: f64,

    /// Largest penalty weight tried before declaring infeasibility.
    #[serde(default = "default_max_penalty")]
    pub max_penalty: f64,
}

fn default_max_iterations() -> u32 {
    2_000
}

fn default_tolerance() -> f64 {
    1e-8
}

fn default_feasibility_tolerance() -> f64 {
    1e-6
}

fn default_initial_penalty() -> f64 {
    10.0
}

fn default_penalty_growth() -> f64 {
    10.0
}

fn default_max_penalty() -> f64 {
    1e8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            feasibility_tolerance: default_feasibility_tolerance(),
            initial_penalty: default_initial_penalty(),
            penalty_growth: default_penalty_growth(),
            max_penalty: default_max_penalty(),
        }
    }
}

impl OptimizerConfig {
    /// Sets the iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the feasibility tolerance.
    #[must_use]
    pub fn with_feasibility_tolerance(mut self, tolerance: f64) -> Self {
        self.feasibility_tolerance = tolerance;
        self
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Data-quality thresholds.
    #[serde(default)]
    pub data_quality: DataQualityConfig,
    /// Factor construction.
    #[serde(default)]
    pub factors: FactorConfig,
    /// Provider concurrency.
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    /// Aggregation parallelism.
    #[serde(default)]
    pub aggregation: AggregationConfig,
    /// Optimizer settings.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl EngineConfig {
    /// Creates a config with the documented starting values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> RiskResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RiskError::configuration(format!("invalid engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> RiskResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RiskError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Sets the minimum observation floor.
    #[must_use]
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.data_quality.min_observations = min_observations;
        self
    }

    /// Caps the number of peers kept per holding.
    #[must_use]
    pub fn with_max_peers(mut self, max_peers: usize) -> Self {
        self.data_quality.max_peers = Some(max_peers);
        self
    }

    /// Sets the return frequency.
    #[must_use]
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.factors.frequency = frequency;
        self
    }

    /// Sets the cash tickers.
    #[must_use]
    pub fn with_cash_tickers(mut self, tickers: Vec<String>) -> Self {
        self.factors.cash_tickers = tickers;
        self
    }

    /// Sets whether style factors are measured in excess of the market.
    #[must_use]
    pub fn with_excess_style_factors(mut self, enabled: bool) -> Self {
        self.factors.excess_style_factors = enabled;
        self
    }

    /// Sets the fitting concurrency.
    #[must_use]
    pub fn with_max_concurrent_assets(mut self, max: usize) -> Self {
        self.concurrency.max_concurrent_assets = max;
        self
    }

    /// Sets the provider timeout.
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.concurrency.provider_timeout_ms =
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the aggregation parallelism.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: AggregationConfig) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Sets the optimizer settings.
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Checks every setting, failing with a configuration error.
    pub fn validate(&self) -> RiskResult<()> {
        let fail = |reason: String| Err(RiskError::configuration(reason));

        if self.data_quality.min_observations < 3 {
            return fail(format!(
                "data_quality.min_observations must be at least 3, got {}",
                self.data_quality.min_observations
            ));
        }
        if self.factors.cash_tickers.iter().any(|t| t.trim().is_empty()) {
            return fail("factors.cash_tickers contains a blank ticker".into());
        }
        if self.concurrency.max_concurrent_assets == 0 {
            return fail("concurrency.max_concurrent_assets must be positive".into());
        }
        if self.concurrency.provider_timeout_ms == 0 {
            return fail("concurrency.provider_timeout_ms must be positive".into());
        }

        let opt = &self.optimizer;
        if opt.max_iterations == 0 {
            return fail("optimizer.max_iterations must be positive".into());
        }
        for (name, value) in [
            ("tolerance", opt.tolerance),
            ("feasibility_tolerance", opt.feasibility_tolerance),
            ("initial_penalty", opt.initial_penalty),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return fail(format!("optimizer.{name} must be positive, got {value}"));
            }
        }
        if !(opt.penalty_growth.is_finite() && opt.penalty_growth > 1.0) {
            return fail(format!(
                "optimizer.penalty_growth must exceed 1, got {}",
                opt.penalty_growth
            ));
        }
        if !(opt.max_penalty.is_finite() && opt.max_penalty >= opt.initial_penalty) {
            return fail(format!(
                "optimizer.max_penalty must be at least initial_penalty, got {}",
                opt.max_penalty
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.data_quality.min_observations, 12);
        assert!(config.factors.excess_style_factors);
        assert_eq!(config.factors.frequency, Frequency::Monthly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [data_quality]
            min_observations = 24

            [factors]
            cash_tickers = ["CASH"]
            "#,
        )
        .unwrap();
        assert_eq!(config.data_quality.min_observations, 24);
        assert!(config.factors.is_cash_ticker("cash"));
        assert_eq!(config.concurrency.max_concurrent_assets, 8);
        assert_eq!(config.optimizer.max_penalty, 1e8);
    }

    #[test]
    fn test_rejects_unknown_and_invalid() {
        assert!(EngineConfig::from_toml_str("[factors]\nfrequncy = \"daily\"").is_err());
        assert!(EngineConfig::from_toml_str("[data_quality]\nmin_observations = 2").is_err());
        assert!(
            EngineConfig::from_toml_str("[concurrency]\nmax_concurrent_assets = 0").is_err()
        );
        assert!(EngineConfig::from_toml_str("[optimizer]\npenalty_growth = 1.0").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[factors]\nfrequency = \"weekly\"").unwrap();
        let config = EngineConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.factors.frequency, Frequency::Weekly);
        assert!(EngineConfig::from_toml_file("/nonexistent/engine.toml").is_err());
    }

    #[test]
    fn test_builder_setters() {
        let config = EngineConfig::new()
            .with_min_observations(36)
            .with_max_peers(3)
            .with_provider_timeout(Duration::from_secs(2));
        assert_eq!(config.data_quality.max_peers, Some(3));
        assert_eq!(config.concurrency.provider_timeout(), Duration::from_secs(2));
    }
}
