//! Per-position weight bounds and output scaling.

use std::collections::BTreeMap;

use factorlens_core::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

/// Slack allowed when checking that the box can sum to one.
const SUM_SLACK: f64 = 1e-12;

/// How solved weights are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScaling {
    /// Weights sum to one.
    #[default]
    Normalized,
    /// Weights are rescaled to the input net exposure.
    Original,
}

/// Bounds for a single ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickerBounds {
    /// Lower weight bound.
    pub lower: f64,
    /// Upper weight bound.
    pub upper: f64,
}

fn default_lower() -> f64 {
    0.0
}

fn default_upper() -> f64 {
    1.0
}

/// Box constraints on normalized weights.
///
/// Defaults to long-only, fully invested: every weight in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightBounds {
    /// Default lower bound.
    #[serde(default = "default_lower")]
    pub lower: f64,
    /// Default upper bound.
    #[serde(default = "default_upper")]
    pub upper: f64,
    /// Per-ticker overrides.
    #[serde(default)]
    pub overrides: BTreeMap<String, TickerBounds>,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self::long_only()
    }
}

impl WeightBounds {
    /// Same bounds for every ticker.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            overrides: BTreeMap::new(),
        }
    }

    /// `[0, 1]` for every ticker.
    pub fn long_only() -> Self {
        Self::new(default_lower(), default_upper())
    }

    /// Overrides the bounds for one ticker.
    #[must_use]
    pub fn with_override(mut self, ticker: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.overrides
            .insert(ticker.into(), TickerBounds { lower, upper });
        self
    }

    /// Bounds that apply to `ticker`.
    pub fn for_ticker(&self, ticker: &str) -> (f64, f64) {
        self.overrides
            .get(ticker)
            .map_or((self.lower, self.upper), |b| (b.lower, b.upper))
    }

    /// Fails on non-finite bounds or a lower bound above its upper bound.
    pub fn validate(&self) -> RiskResult<()> {
        let entries = std::iter::once(("default", self.lower, self.upper)).chain(
            self.overrides
                .iter()
                .map(|(t, b)| (t.as_str(), b.lower, b.upper)),
        );
        for (name, lower, upper) in entries {
            if !lower.is_finite() || !upper.is_finite() {
                return Err(RiskError::configuration(format!(
                    "weight bounds for {name} must be finite"
                )));
            }
            if lower > upper {
                return Err(RiskError::configuration(format!(
                    "weight bounds for {name}: lower {lower} exceeds upper {upper}"
                )));
            }
        }
        Ok(())
    }

    /// Resolves per-ticker bounds, tightened by an optional position limit.
    ///
    /// Returns the name of the binding constraint when the box cannot hold
    /// weights summing to one.
    pub(crate) fn resolve(
        &self,
        tickers: &[String],
        position_limit: Option<f64>,
    ) -> Result<(Vec<f64>, Vec<f64>), String> {
        let (lower, upper): (Vec<f64>, Vec<f64>) =
            tickers.iter().map(|t| self.for_ticker(t)).unzip();
        if !reaches_one(&lower, &upper) {
            return Err("weight bounds".to_string());
        }

        let Some(limit) = position_limit else {
            return Ok((lower, upper));
        };
        let lower: Vec<f64> = lower.iter().map(|l| l.max(-limit)).collect();
        let upper: Vec<f64> = upper.iter().map(|u| u.min(limit)).collect();
        if lower.iter().zip(&upper).any(|(l, u)| l > u) || !reaches_one(&lower, &upper) {
            return Err("max_position_weight".to_string());
        }
        Ok((lower, upper))
    }
}

fn reaches_one(lower: &[f64], upper: &[f64]) -> bool {
    lower.iter().sum::<f64>() <= 1.0 + SUM_SLACK && upper.iter().sum::<f64>() >= 1.0 - SUM_SLACK
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("T{i}")).collect()
    }

    #[test]
    fn test_position_limit_tightens_box() {
        let bounds = WeightBounds::new(-1.0, 1.0).with_override("T1", 0.1, 0.2);
        let (lower, upper) = bounds.resolve(&tickers(3), Some(0.5)).unwrap();
        assert_eq!(lower, vec![-0.5, 0.1, -0.5]);
        assert_eq!(upper, vec![0.5, 0.2, 0.5]);
    }

    #[test]
    fn test_infeasible_box_names_constraint() {
        let bounds = WeightBounds::new(0.0, 0.3);
        assert_eq!(
            bounds.resolve(&tickers(3), None).unwrap_err(),
            "weight bounds"
        );
        assert_eq!(
            WeightBounds::long_only()
                .resolve(&tickers(2), Some(0.4))
                .unwrap_err(),
            "max_position_weight"
        );
    }

    #[test]
    fn test_limit_above_lower_bound_is_infeasible() {
        let bounds = WeightBounds::long_only().with_override("T0", 0.6, 1.0);
        assert_eq!(
            bounds.resolve(&tickers(3), Some(0.5)).unwrap_err(),
            "max_position_weight"
        );
    }

    #[test]
    fn test_validate() {
        assert!(WeightBounds::long_only().validate().is_ok());
        assert!(WeightBounds::new(0.5, 0.1).validate().is_err());
        assert!(WeightBounds::long_only()
            .with_override("X", f64::NAN, 1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let bounds: WeightBounds =
            serde_json::from_str(r#"{ "overrides": { "AAPL": { "lower": 0.05, "upper": 0.3 } } }"#)
                .unwrap();
        assert_eq!(bounds.for_ticker("AAPL"), (0.05, 0.3));
        assert_eq!(bounds.for_ticker("MSFT"), (0.0, 1.0));
    }
}
