//! Fitted single-asset factor models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FactorId, Frequency};
use crate::error::{RiskError, RiskResult};

/// Regression diagnostics attached to a fitted model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// The design matrix was rank deficient; betas are the minimum-norm solution.
    pub rank_deficient: bool,
    /// The unexplained variance came out negative and was floored at zero.
    pub idiosyncratic_clamped: bool,
    /// Standard error per beta.
    pub standard_errors: BTreeMap<FactorId, f64>,
    /// t-statistic per beta (None when the standard error is zero).
    pub t_stats: BTreeMap<FactorId, Option<f64>>,
    /// Two-sided p-value per beta from the Student-t distribution.
    #[serde(default)]
    pub p_values: BTreeMap<FactorId, Option<f64>>,
    /// Peers excluded by the data-quality filter.
    pub dropped_peers: Vec<String>,
}

/// Per-holding factor model.
///
/// Produced once per run by the fitter and never mutated afterwards; a change
/// of inputs produces a new model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFactorModel {
    /// Holding ticker.
    pub ticker: String,
    /// Beta per factor.
    pub betas: BTreeMap<FactorId, f64>,
    /// Regression intercept (per period).
    pub alpha: f64,
    /// Idiosyncratic variance per period, never negative.
    pub idiosyncratic_variance: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Observations used in the regression.
    pub observations: usize,
    /// Frequency of the returns the model was fit on.
    pub frequency: Frequency,
    /// Fit diagnostics.
    pub diagnostics: FitDiagnostics,
}

impl AssetFactorModel {
    /// Creates a model from betas and idiosyncratic variance.
    ///
    /// Fails on non-finite betas or a negative or non-finite variance.
    pub fn new(
        ticker: impl Into<String>,
        frequency: Frequency,
        betas: BTreeMap<FactorId, f64>,
        idiosyncratic_variance: f64,
    ) -> RiskResult<Self> {
        let ticker = ticker.into();
        if !(idiosyncratic_variance >= 0.0 && idiosyncratic_variance.is_finite()) {
            return Err(RiskError::data_quality(
                &ticker,
                format!("invalid idiosyncratic variance {idiosyncratic_variance}"),
            ));
        }
        if let Some((factor, beta)) = betas.iter().find(|(_, b)| !b.is_finite()) {
            return Err(RiskError::data_quality(
                &ticker,
                format!("non-finite beta {beta} on {factor}"),
            ));
        }
        Ok(Self {
            ticker,
            betas,
            alpha: 0.0,
            idiosyncratic_variance,
            r_squared: 0.0,
            observations: 0,
            frequency,
            diagnostics: FitDiagnostics::default(),
        })
    }

    /// Model for a cash-like holding: no betas, no idiosyncratic variance.
    pub fn cash(ticker: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            ticker: ticker.into(),
            betas: BTreeMap::new(),
            alpha: 0.0,
            idiosyncratic_variance: 0.0,
            r_squared: 0.0,
            observations: 0,
            frequency,
            diagnostics: FitDiagnostics::default(),
        }
    }

    /// Attaches regression statistics.
    pub fn with_fit_stats(
        mut self,
        alpha: f64,
        r_squared: f64,
        observations: usize,
        diagnostics: FitDiagnostics,
    ) -> Self {
        self.alpha = alpha;
        self.r_squared = r_squared;
        self.observations = observations;
        self.diagnostics = diagnostics;
        self
    }

    /// Beta on `factor`, zero if the model has no exposure to it.
    pub fn beta(&self, factor: &FactorId) -> f64 {
        self.betas.get(factor).copied().unwrap_or(0.0)
    }

    /// Returns true for a cash-like model.
    pub fn is_cash(&self) -> bool {
        self.betas.is_empty() && self.idiosyncratic_variance == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_model() {
        let cash = AssetFactorModel::cash("CASH", Frequency::Monthly);
        assert!(cash.is_cash());
        assert_eq!(cash.beta(&FactorId::market("SPY")), 0.0);
    }

    #[test]
    fn test_rejects_negative_variance() {
        let result = AssetFactorModel::new("X", Frequency::Monthly, BTreeMap::new(), -1e-6);
        assert!(matches!(result, Err(RiskError::DataQuality { .. })));
        let nan = AssetFactorModel::new("X", Frequency::Monthly, BTreeMap::new(), f64::NAN);
        assert!(nan.is_err());
    }

    #[test]
    fn test_beta_lookup() {
        let mut betas = BTreeMap::new();
        betas.insert(FactorId::market("SPY"), 1.2);
        let model = AssetFactorModel::new("AAPL", Frequency::Monthly, betas, 0.002).unwrap();
        assert_eq!(model.beta(&FactorId::market("SPY")), 1.2);
        assert_eq!(model.beta(&FactorId::industry("XLK")), 0.0);
        assert!(!model.is_cash());
    }
}
