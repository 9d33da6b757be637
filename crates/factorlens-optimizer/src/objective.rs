//! Optimization objectives.

use std::collections::BTreeMap;

use factorlens_core::{RiskError, RiskResult};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// What the optimizer minimizes or maximizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Objective {
    /// Minimize annualized portfolio variance.
    MinVariance,
    /// Maximize `Σ w_i μ_i`.
    MaxReturn {
        /// Expected return per ticker. Every holding needs one.
        expected_returns: BTreeMap<String, f64>,
    },
}

impl Objective {
    /// Maximum-return objective.
    pub fn max_return(expected_returns: BTreeMap<String, f64>) -> Self {
        Objective::MaxReturn { expected_returns }
    }

    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Objective::MinVariance => "min_variance",
            Objective::MaxReturn { .. } => "max_return",
        }
    }

    /// Expected returns aligned to `tickers`, for the max-return objective.
    pub(crate) fn expected_returns(&self, tickers: &[String]) -> RiskResult<Option<DVector<f64>>> {
        let Objective::MaxReturn { expected_returns } = self else {
            return Ok(None);
        };
        let values = tickers
            .iter()
            .map(|t| match expected_returns.get(t) {
                Some(mu) if mu.is_finite() => Ok(*mu),
                Some(mu) => Err(RiskError::configuration(format!(
                    "expected return for {t} must be finite, got {mu}"
                ))),
                None => Err(RiskError::configuration(format!(
                    "no expected return for {t}"
                ))),
            })
            .collect::<RiskResult<Vec<f64>>>()?;
        Ok(Some(DVector::from_vec(values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_expected_return() {
        let objective = Objective::max_return([("AAPL".to_string(), 0.1)].into_iter().collect());
        let tickers = vec!["AAPL".to_string(), "XOM".to_string()];
        assert!(matches!(
            objective.expected_returns(&tickers),
            Err(RiskError::Configuration { .. })
        ));
    }

    #[test]
    fn test_min_variance_has_no_returns() {
        let tickers = vec!["AAPL".to_string()];
        assert!(Objective::MinVariance
            .expected_returns(&tickers)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_serde_tag() {
        let json = serde_json::to_string(&Objective::MinVariance).unwrap();
        assert_eq!(json, r#"{"kind":"min_variance"}"#);
    }
}
