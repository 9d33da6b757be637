//! Factor risk model over a fixed set of holdings.
//!
//! With exposures `B` (holdings × factors), factor covariance `Σ_F` and
//! idiosyncratic variances `D`, the asset covariance is `Σ = B Σ_F Bᵀ + D`.
//! It is never formed explicitly: every quantity goes through the factor
//! exposure `e = Bᵀw`.

use std::collections::BTreeMap;

use factorlens_core::types::{AssetFactorModel, FactorCovariance, FactorId, Holding};
use factorlens_core::{RiskError, RiskResult};
use nalgebra::{DMatrix, DVector};

/// Per-period factor risk model aligned to a list of holdings.
#[derive(Debug, Clone)]
pub struct FactorRiskModel {
    tickers: Vec<String>,
    factors: Vec<FactorId>,
    exposures: DMatrix<f64>,
    factor_covariance: DMatrix<f64>,
    idiosyncratic: DVector<f64>,
    periods_per_year: f64,
}

impl FactorRiskModel {
    /// Builds the model for `holdings`, in holding order.
    ///
    /// Every holding needs a model, and every beta must name a factor in
    /// `covariance`; otherwise this is a configuration error.
    pub fn new(
        holdings: &[Holding],
        models: &[AssetFactorModel],
        covariance: &FactorCovariance,
    ) -> RiskResult<Self> {
        let by_ticker: BTreeMap<&str, &AssetFactorModel> =
            models.iter().map(|m| (m.ticker.as_str(), m)).collect();

        let n = holdings.len();
        let k = covariance.dimension();
        let mut exposures = DMatrix::zeros(n, k);
        let mut idiosyncratic = DVector::zeros(n);

        for (i, holding) in holdings.iter().enumerate() {
            let model = by_ticker.get(holding.ticker.as_str()).ok_or_else(|| {
                RiskError::configuration(format!("no factor model for {}", holding.ticker))
            })?;
            if !model.is_cash() && model.frequency != covariance.frequency() {
                return Err(RiskError::configuration(format!(
                    "model for {} is {} but covariance is {}",
                    holding.ticker,
                    model.frequency,
                    covariance.frequency()
                )));
            }
            for (factor, beta) in &model.betas {
                let j = covariance.index_of(factor).ok_or_else(|| {
                    RiskError::configuration(format!(
                        "{} has a beta on {factor}, which the covariance does not cover",
                        holding.ticker
                    ))
                })?;
                exposures[(i, j)] = *beta;
            }
            idiosyncratic[i] = model.idiosyncratic_variance;
        }

        Ok(Self {
            tickers: holdings.iter().map(|h| h.ticker.clone()).collect(),
            factors: covariance.factors().to_vec(),
            exposures,
            factor_covariance: covariance.matrix().clone(),
            idiosyncratic,
            periods_per_year: covariance.frequency().annualization_factor(),
        })
    }

    /// Holding tickers in row order.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Factors in column order.
    pub fn factors(&self) -> &[FactorId] {
        &self.factors
    }

    /// Number of holdings.
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    /// Returns true if the model covers no holdings.
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Beta matrix `B` (holdings × factors).
    pub fn exposure_matrix(&self) -> &DMatrix<f64> {
        &self.exposures
    }

    /// Factor covariance `Σ_F`.
    pub fn factor_covariance(&self) -> &DMatrix<f64> {
        &self.factor_covariance
    }

    /// Idiosyncratic variances, per period.
    pub fn idiosyncratic_variances(&self) -> &DVector<f64> {
        &self.idiosyncratic
    }

    /// Periods per year of the underlying returns.
    pub fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    /// Portfolio factor exposure `e = Bᵀw`.
    pub fn factor_exposure(&self, weights: &DVector<f64>) -> DVector<f64> {
        self.exposures.tr_mul(weights)
    }

    /// `Σ_F e`.
    pub fn factor_marginal(&self, exposure: &DVector<f64>) -> DVector<f64> {
        &self.factor_covariance * exposure
    }

    /// Factor variance `eᵀ Σ_F e`, per period.
    pub fn factor_variance(&self, weights: &DVector<f64>) -> f64 {
        let e = self.factor_exposure(weights);
        e.dot(&self.factor_marginal(&e))
    }

    /// Idiosyncratic variance `Σ w_i² σ_i²`, per period.
    pub fn idiosyncratic_variance(&self, weights: &DVector<f64>) -> f64 {
        weights
            .iter()
            .zip(self.idiosyncratic.iter())
            .map(|(w, s)| w * w * s)
            .sum()
    }

    /// Total variance, per period.
    pub fn variance(&self, weights: &DVector<f64>) -> f64 {
        self.factor_variance(weights) + self.idiosyncratic_variance(weights)
    }

    /// `Σw = B Σ_F Bᵀ w + D w`, per period.
    pub fn marginal(&self, weights: &DVector<f64>) -> DVector<f64> {
        let e = self.factor_exposure(weights);
        let mut m = &self.exposures * self.factor_marginal(&e);
        for (i, mi) in m.iter_mut().enumerate() {
            *mi += self.idiosyncratic[i] * weights[i];
        }
        m
    }

    /// Gradient of the per-period variance, `2Σw`.
    pub fn variance_gradient(&self, weights: &DVector<f64>) -> DVector<f64> {
        self.marginal(weights) * 2.0
    }

    /// Full asset covariance `B Σ_F Bᵀ + D`, per period.
    pub fn asset_covariance(&self) -> DMatrix<f64> {
        let mut cov = &self.exposures * &self.factor_covariance * self.exposures.transpose();
        for i in 0..self.len() {
            cov[(i, i)] += self.idiosyncratic[i];
        }
        cov
    }
}
