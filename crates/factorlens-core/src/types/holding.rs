//! Portfolio positions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{RiskError, RiskResult};

/// A single position.
///
/// `weight` is the signed economic exposure as a share of portfolio value.
/// Weights need not sum to one; nothing in the risk path normalizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Instrument ticker.
    pub ticker: String,
    /// Signed exposure share.
    pub weight: f64,
    /// Dollar exposure, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dollar_exposure: Option<f64>,
}

impl Holding {
    /// Creates a holding from a weight.
    pub fn new(ticker: impl Into<String>, weight: f64) -> Self {
        Self {
            ticker: ticker.into(),
            weight,
            dollar_exposure: None,
        }
    }

    /// Derives the weight from a dollar exposure and the portfolio value.
    pub fn from_exposure(
        ticker: impl Into<String>,
        dollar_exposure: f64,
        portfolio_value: f64,
    ) -> RiskResult<Self> {
        let ticker = ticker.into();
        if !portfolio_value.is_finite() || portfolio_value == 0.0 {
            return Err(RiskError::configuration(format!(
                "cannot derive weight for {ticker}: portfolio value {portfolio_value}"
            )));
        }
        if !dollar_exposure.is_finite() {
            return Err(RiskError::configuration(format!(
                "non-finite dollar exposure for {ticker}"
            )));
        }
        Ok(Self {
            weight: dollar_exposure / portfolio_value,
            dollar_exposure: Some(dollar_exposure),
            ticker,
        })
    }

    /// Attaches a dollar exposure.
    pub fn with_dollar_exposure(mut self, dollars: f64) -> Self {
        self.dollar_exposure = Some(dollars);
        self
    }
}

/// Validates a portfolio: non-empty, unique non-blank tickers, finite weights.
pub fn validate_holdings(holdings: &[Holding]) -> RiskResult<()> {
    if holdings.is_empty() {
        return Err(RiskError::configuration("portfolio has no holdings"));
    }
    let mut seen = BTreeSet::new();
    for h in holdings {
        if h.ticker.trim().is_empty() {
            return Err(RiskError::configuration("holding with blank ticker"));
        }
        if !h.weight.is_finite() {
            return Err(RiskError::configuration(format!(
                "non-finite weight for {}",
                h.ticker
            )));
        }
        if !seen.insert(h.ticker.as_str()) {
            return Err(RiskError::configuration(format!(
                "duplicate holding {}",
                h.ticker
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_exposure() {
        let h = Holding::from_exposure("AAPL", 60_000.0, 100_000.0).unwrap();
        assert_relative_eq!(h.weight, 0.6);
        assert_eq!(h.dollar_exposure, Some(60_000.0));
        assert!(Holding::from_exposure("AAPL", 1.0, 0.0).is_err());
    }

    #[test]
    fn test_leverage_allowed() {
        let holdings = vec![Holding::new("AAPL", 1.5), Holding::new("MSFT", -0.5)];
        assert!(validate_holdings(&holdings).is_ok());
    }

    #[test]
    fn test_rejects_duplicates_and_nan() {
        let dup = vec![Holding::new("AAPL", 0.5), Holding::new("AAPL", 0.5)];
        assert!(matches!(
            validate_holdings(&dup),
            Err(RiskError::Configuration { .. })
        ));
        let nan = vec![Holding::new("AAPL", f64::NAN)];
        assert!(validate_holdings(&nan).is_err());
        assert!(validate_holdings(&[]).is_err());
    }
}
