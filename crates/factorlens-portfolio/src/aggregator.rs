//! Portfolio risk aggregation.
//!
//! Variance splits into a factor part `eᵀ Σ_F e` and an idiosyncratic part
//! `Σ w_i² σ_i²`; the two never overlap. Position contributions use the Euler
//! decomposition `RC_i = w_i (Σw)_i / σ`, which sums to `σ`. All variances
//! in the summary are annualized by the covariance frequency.

use std::collections::BTreeMap;

use factorlens_core::config::AggregationConfig;
use factorlens_core::types::{
    validate_holdings, AssetFactorModel, FactorCovariance, FactorId, FactorKind, Frequency,
    Holding,
};
use factorlens_core::RiskResult;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::parallel::maybe_parallel_map;
use crate::risk_model::FactorRiskModel;

/// Risk attributed to one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRisk {
    /// Holding ticker.
    pub ticker: String,
    /// Raw weight.
    pub weight: f64,
    /// `w_i (Σw)_i`, annualized. Sums to total variance.
    pub variance_contribution: f64,
    /// `w_i (Σw)_i / σ`. Sums to volatility.
    pub risk_contribution: f64,
    /// Share of total variance.
    pub share_of_variance: f64,
}

/// Portfolio-level risk decomposition.
///
/// Derived wholesale from holdings, models and covariance; never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRiskSummary {
    /// Annualized volatility.
    pub volatility: f64,
    /// Annualized total variance.
    pub total_variance: f64,
    /// Annualized factor variance.
    pub factor_variance: f64,
    /// Annualized idiosyncratic variance.
    pub idiosyncratic_variance: f64,
    /// Variance contribution per factor, `e_f (Σ_F e)_f`. Sums to factor variance.
    pub factor_contributions: BTreeMap<FactorId, f64>,
    /// Share of total variance per factor kind.
    pub kind_shares: BTreeMap<FactorKind, f64>,
    /// Per-position contributions, in holding order.
    pub positions: Vec<PositionRisk>,
    /// Herfindahl index on raw weights.
    pub herfindahl: f64,
    /// Portfolio beta per factor, `Σ w_i β_i,f`.
    pub portfolio_betas: BTreeMap<FactorId, f64>,
    /// Worst-case single-period loss per factor, as a positive magnitude.
    /// Empty when the covariance carries no worst/best returns.
    pub factor_losses: BTreeMap<FactorId, f64>,
    /// Largest entry of `factor_losses`, if they were computed.
    pub max_single_factor_loss: Option<f64>,
    /// Sum of absolute weights.
    pub gross_exposure: f64,
    /// Sum of weights.
    pub net_exposure: f64,
    /// Largest absolute weight.
    pub max_position_weight: f64,
    /// Frequency the variances were annualized from.
    pub frequency: Frequency,
}

impl PortfolioRiskSummary {
    /// Factor variance as a share of total variance (0 when total is 0).
    pub fn factor_share(&self) -> f64 {
        share(self.factor_variance, self.total_variance)
    }

    /// Share of total variance from factors of `kind`.
    pub fn kind_share(&self, kind: FactorKind) -> f64 {
        self.kind_shares.get(&kind).copied().unwrap_or(0.0)
    }

    /// Sum of position risk contributions.
    pub fn risk_contribution_total(&self) -> f64 {
        self.positions.iter().map(|p| p.risk_contribution).sum()
    }

    /// Sum of position variance contributions.
    pub fn variance_contribution_total(&self) -> f64 {
        self.positions.iter().map(|p| p.variance_contribution).sum()
    }

    /// Position risk for `ticker`.
    pub fn position(&self, ticker: &str) -> Option<&PositionRisk> {
        self.positions.iter().find(|p| p.ticker == ticker)
    }
}

fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total
    } else {
        0.0
    }
}

/// Computes portfolio risk summaries.
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: AggregationConfig,
}

impl Aggregator {
    /// Creates an aggregator with the given parallelism settings.
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// Creates an aggregator that never runs in parallel.
    pub fn sequential() -> Self {
        Self {
            config: AggregationConfig {
                parallel: false,
                parallel_threshold: usize::MAX,
            },
        }
    }

    /// Aggregates holdings, per-asset models and factor covariance.
    ///
    /// Fails with a configuration error when a holding has no model, when a
    /// model has a beta on a factor the covariance does not cover, or when
    /// the holdings are malformed.
    pub fn aggregate(
        &self,
        holdings: &[Holding],
        models: &[AssetFactorModel],
        covariance: &FactorCovariance,
    ) -> RiskResult<PortfolioRiskSummary> {
        validate_holdings(holdings)?;
        let model = FactorRiskModel::new(holdings, models, covariance)?;
        let weights = DVector::from_iterator(holdings.len(), holdings.iter().map(|h| h.weight));
        Ok(self.summarize(&model, &weights, covariance))
    }

    fn summarize(
        &self,
        model: &FactorRiskModel,
        weights: &DVector<f64>,
        covariance: &FactorCovariance,
    ) -> PortfolioRiskSummary {
        let ppy = model.periods_per_year();
        let exposure = model.factor_exposure(weights);
        let factor_marginal = model.factor_marginal(&exposure);

        let factor_variance = exposure.dot(&factor_marginal) * ppy;
        let idiosyncratic_variance = model.idiosyncratic_variance(weights) * ppy;
        let total_variance = factor_variance + idiosyncratic_variance;
        let volatility = total_variance.max(0.0).sqrt();

        let marginal = model.marginal(weights);
        let indices: Vec<usize> = (0..model.len()).collect();
        let positions = maybe_parallel_map(&indices, &self.config, |&i| {
            let w = weights[i];
            let variance_contribution = w * marginal[i] * ppy;
            PositionRisk {
                ticker: model.tickers()[i].clone(),
                weight: w,
                variance_contribution,
                risk_contribution: if volatility > 0.0 {
                    variance_contribution / volatility
                } else {
                    0.0
                },
                share_of_variance: share(variance_contribution, total_variance),
            }
        });

        let mut factor_contributions = BTreeMap::new();
        let mut portfolio_betas = BTreeMap::new();
        let mut kind_totals: BTreeMap<FactorKind, f64> =
            FactorKind::ALL.into_iter().map(|k| (k, 0.0)).collect();
        for (j, factor) in model.factors().iter().enumerate() {
            let contribution = exposure[j] * factor_marginal[j] * ppy;
            factor_contributions.insert(factor.clone(), contribution);
            portfolio_betas.insert(factor.clone(), exposure[j]);
            *kind_totals.entry(factor.kind()).or_insert(0.0) += contribution;
        }
        let kind_shares = kind_totals
            .into_iter()
            .map(|(kind, v)| (kind, share(v, total_variance)))
            .collect();

        let (factor_losses, max_single_factor_loss) = if covariance.has_extremes()
            || covariance.dimension() == 0
        {
            let losses: BTreeMap<FactorId, f64> = model
                .factors()
                .iter()
                .enumerate()
                .filter_map(|(j, factor)| {
                    let (worst, best) = covariance.extremes(j)?;
                    let beta = exposure[j];
                    Some((factor.clone(), (-(beta * worst).min(beta * best)).max(0.0)))
                })
                .collect();
            let max = losses.values().copied().fold(0.0, f64::max);
            (losses, Some(max))
        } else {
            (BTreeMap::new(), None)
        };

        PortfolioRiskSummary {
            volatility,
            total_variance,
            factor_variance,
            idiosyncratic_variance,
            factor_contributions,
            kind_shares,
            positions,
            herfindahl: weights.iter().map(|w| w * w).sum(),
            portfolio_betas,
            factor_losses,
            max_single_factor_loss,
            gross_exposure: weights.iter().map(|w| w.abs()).sum(),
            net_exposure: weights.iter().sum(),
            max_position_weight: weights.iter().map(|w| w.abs()).fold(0.0, f64::max),
            frequency: covariance.frequency(),
        }
    }
}

/// Aggregates sequentially. See [`Aggregator::aggregate`].
pub fn aggregate(
    holdings: &[Holding],
    models: &[AssetFactorModel],
    covariance: &FactorCovariance,
) -> RiskResult<PortfolioRiskSummary> {
    Aggregator::sequential().aggregate(holdings, models, covariance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn covariance() -> FactorCovariance {
        FactorCovariance::new(
            vec![FactorId::market("SPY"), FactorId::industry("XLK")],
            DMatrix::from_row_slice(2, 2, &[0.0020, 0.0008, 0.0008, 0.0030]),
            Frequency::Monthly,
            36,
        )
        .unwrap()
        .with_extremes(vec![-0.10, -0.15], vec![0.08, 0.12])
        .unwrap()
    }

    fn models() -> Vec<AssetFactorModel> {
        vec![
            AssetFactorModel::new(
                "AAPL",
                Frequency::Monthly,
                [(FactorId::market("SPY"), 1.2), (FactorId::industry("XLK"), 0.4)]
                    .into_iter()
                    .collect(),
                0.0010,
            )
            .unwrap(),
            AssetFactorModel::new(
                "XOM",
                Frequency::Monthly,
                [(FactorId::market("SPY"), 0.8)].into_iter().collect(),
                0.0020,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_decomposition() {
        let holdings = vec![Holding::new("AAPL", 0.7), Holding::new("XOM", 0.3)];
        let s = aggregate(&holdings, &models(), &covariance()).unwrap();

        // e = [0.7*1.2 + 0.3*0.8, 0.7*0.4] = [1.08, 0.28]
        assert_relative_eq!(s.portfolio_betas[&FactorId::market("SPY")], 1.08, epsilon = 1e-15);
        assert_relative_eq!(s.portfolio_betas[&FactorId::industry("XLK")], 0.28, epsilon = 1e-15);

        let factor = 1.08 * 1.08 * 0.002 + 2.0 * 1.08 * 0.28 * 0.0008 + 0.28 * 0.28 * 0.003;
        let idio = 0.49 * 0.001 + 0.09 * 0.002;
        assert_relative_eq!(s.factor_variance, factor * 12.0, max_relative = 1e-12);
        assert_relative_eq!(s.idiosyncratic_variance, idio * 12.0, max_relative = 1e-12);
        assert_relative_eq!(s.volatility, ((factor + idio) * 12.0).sqrt(), max_relative = 1e-12);

        assert_relative_eq!(s.risk_contribution_total(), s.volatility, max_relative = 1e-12);
        let factor_sum: f64 = s.factor_contributions.values().sum();
        assert_relative_eq!(factor_sum, s.factor_variance, max_relative = 1e-12);
        assert_relative_eq!(s.herfindahl, 0.58, epsilon = 1e-15);
        assert_relative_eq!(s.gross_exposure, 1.0);
    }

    #[test]
    fn test_worst_case_losses() {
        let holdings = vec![Holding::new("AAPL", 0.7), Holding::new("XOM", -0.3)];
        let s = aggregate(&holdings, &models(), &covariance()).unwrap();
        // market beta 0.84 * -0.10; industry beta 0.28 * -0.15
        assert_relative_eq!(s.factor_losses[&FactorId::market("SPY")], 0.084, epsilon = 1e-12);
        assert_relative_eq!(s.factor_losses[&FactorId::industry("XLK")], 0.042, epsilon = 1e-12);
        assert_relative_eq!(s.max_single_factor_loss.unwrap(), 0.084, epsilon = 1e-12);
        assert_relative_eq!(s.net_exposure, 0.4, epsilon = 1e-15);
    }

    #[test]
    fn test_short_beta_loses_on_rally() {
        let holdings = vec![Holding::new("XOM", -1.0)];
        let models = models();
        let s = aggregate(&holdings, &models[1..], &covariance()).unwrap();
        // beta -0.8 on a +0.08 month
        assert_relative_eq!(s.factor_losses[&FactorId::market("SPY")], 0.064, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_has_zero_contributions() {
        let holdings = vec![Holding::new("CASH", 1.0)];
        let models = vec![AssetFactorModel::cash("CASH", Frequency::Monthly)];
        let s = aggregate(&holdings, &models, &covariance()).unwrap();
        assert_eq!(s.total_variance, 0.0);
        assert_eq!(s.volatility, 0.0);
        assert_eq!(s.positions[0].risk_contribution, 0.0);
        assert_eq!(s.factor_share(), 0.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let holdings = vec![Holding::new("AAPL", 0.7), Holding::new("XOM", 0.3)];
        let parallel = Aggregator::new(AggregationConfig {
            parallel: true,
            parallel_threshold: 1,
        });
        let a = parallel.aggregate(&holdings, &models(), &covariance()).unwrap();
        let b = aggregate(&holdings, &models(), &covariance()).unwrap();
        assert_eq!(a, b);
    }
}
