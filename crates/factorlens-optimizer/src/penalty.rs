//! Augmented Lagrangian terms for risk limits.
//!
//! Each limit except the single-position weight becomes one or more
//! constraints `g(w) <= 0` with an analytic gradient. For multiplier `λ` and
//! penalty `ρ` a constraint contributes `(s² - λ²) / 2ρ` with
//! `s = max(0, λ + ρg)`. Share limits are written as `part - limit * total`
//! so they stay smooth where total variance is small. Variance-valued
//! constraints are divided by the variance at the starting point so `ρ`
//! means the same thing across portfolios.

use factorlens_core::types::{FactorCovariance, FactorKind, LimitMetric, RiskLimitSet};
use factorlens_core::{RiskError, RiskResult};
use factorlens_portfolio::FactorRiskModel;
use nalgebra::DVector;

/// Risk quantities at one weight vector, annualized.
pub(crate) struct RiskPoint<'a> {
    model: &'a FactorRiskModel,
    weights: DVector<f64>,
    exposure: DVector<f64>,
    factor_marginal: DVector<f64>,
    marginal: DVector<f64>,
}

impl<'a> RiskPoint<'a> {
    pub(crate) fn new(model: &'a FactorRiskModel, weights: DVector<f64>) -> Self {
        let exposure = model.factor_exposure(&weights);
        let factor_marginal = model.factor_marginal(&exposure);
        let marginal = model.marginal(&weights);
        Self {
            model,
            weights,
            exposure,
            factor_marginal,
            marginal,
        }
    }

    pub(crate) fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    fn ppy(&self) -> f64 {
        self.model.periods_per_year()
    }

    pub(crate) fn variance(&self) -> f64 {
        self.factor_variance() + self.model.idiosyncratic_variance(&self.weights) * self.ppy()
    }

    pub(crate) fn variance_gradient(&self) -> DVector<f64> {
        &self.marginal * (2.0 * self.ppy())
    }

    fn factor_variance(&self) -> f64 {
        self.exposure.dot(&self.factor_marginal) * self.ppy()
    }

    fn factor_variance_gradient(&self) -> DVector<f64> {
        self.model.exposure_matrix() * &self.factor_marginal * (2.0 * self.ppy())
    }

    fn kind_variance(&self, mask: &DVector<f64>) -> f64 {
        mask.component_mul(&self.exposure).dot(&self.factor_marginal) * self.ppy()
    }

    // d/de Σ_f m_f e_f (Σ_F e)_f = m ∘ Σ_F e + Σ_F (m ∘ e)
    fn kind_variance_gradient(&self, mask: &DVector<f64>) -> DVector<f64> {
        let masked = mask.component_mul(&self.exposure);
        let de = mask.component_mul(&self.factor_marginal) + self.model.factor_covariance() * masked;
        self.model.exposure_matrix() * de * self.ppy()
    }
}

#[derive(Debug, Clone)]
enum Constraint {
    Volatility { limit: f64 },
    FactorShare { limit: f64 },
    KindShare { mask: DVector<f64>, limit: f64 },
    // coefficient * e_j <= limit
    FactorLoss { column: usize, coefficient: f64, limit: f64 },
    GrossExposure { limit: f64 },
}

impl Constraint {
    fn is_variance(&self) -> bool {
        matches!(
            self,
            Constraint::Volatility { .. } | Constraint::FactorShare { .. } | Constraint::KindShare { .. }
        )
    }

    fn value(&self, point: &RiskPoint<'_>) -> f64 {
        match self {
            Constraint::Volatility { limit } => point.variance() - limit * limit,
            Constraint::FactorShare { limit } => point.factor_variance() - limit * point.variance(),
            Constraint::KindShare { mask, limit } => {
                point.kind_variance(mask) - limit * point.variance()
            }
            Constraint::FactorLoss {
                column,
                coefficient,
                limit,
            } => coefficient * point.exposure[*column] - limit,
            Constraint::GrossExposure { limit } => {
                point.weights.iter().map(|w| w.abs()).sum::<f64>() - limit
            }
        }
    }

    fn gradient(&self, point: &RiskPoint<'_>) -> DVector<f64> {
        match self {
            Constraint::Volatility { .. } => point.variance_gradient(),
            Constraint::FactorShare { limit } => {
                point.factor_variance_gradient() - point.variance_gradient() * *limit
            }
            Constraint::KindShare { mask, limit } => {
                point.kind_variance_gradient(mask) - point.variance_gradient() * *limit
            }
            Constraint::FactorLoss {
                column,
                coefficient,
                ..
            } => point.model.exposure_matrix().column(*column) * *coefficient,
            Constraint::GrossExposure { .. } => point.weights.map(|w| {
                if w > 0.0 {
                    1.0
                } else if w < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }),
        }
    }
}

/// Augmented Lagrangian over every limit other than the position weight.
#[derive(Debug, Clone)]
pub(crate) struct Penalty {
    constraints: Vec<(LimitMetric, Constraint)>,
    multipliers: Vec<f64>,
    variance_scale: f64,
}

impl Penalty {
    /// Builds constraints for `limits`, which must already be in the
    /// optimizer's normalized units. Variance constraints are divided by
    /// `variance_scale` (1 when it is not positive).
    pub(crate) fn new(
        model: &FactorRiskModel,
        limits: &RiskLimitSet,
        covariance: &FactorCovariance,
        variance_scale: f64,
    ) -> RiskResult<Self> {
        let mut constraints = Vec::new();
        for (metric, limit) in limits.entries() {
            match metric {
                LimitMetric::PositionWeight => {}
                LimitMetric::Volatility => {
                    constraints.push((metric, Constraint::Volatility { limit }));
                }
                LimitMetric::FactorShare => {
                    constraints.push((metric, Constraint::FactorShare { limit }));
                }
                LimitMetric::MarketShare => constraints.push((
                    metric,
                    Constraint::KindShare {
                        mask: kind_mask(model, FactorKind::Market),
                        limit,
                    },
                )),
                LimitMetric::IndustryShare => constraints.push((
                    metric,
                    Constraint::KindShare {
                        mask: kind_mask(model, FactorKind::Industry),
                        limit,
                    },
                )),
                LimitMetric::SingleFactorLoss => {
                    if covariance.dimension() > 0 && !covariance.has_extremes() {
                        return Err(RiskError::configuration(format!(
                            "{metric} is configured but factor worst-case returns are unavailable"
                        )));
                    }
                    for column in 0..covariance.dimension() {
                        let Some((worst, best)) = covariance.extremes(column) else {
                            continue;
                        };
                        for coefficient in [-worst, -best] {
                            constraints.push((
                                metric,
                                Constraint::FactorLoss {
                                    column,
                                    coefficient,
                                    limit,
                                },
                            ));
                        }
                    }
                }
                LimitMetric::GrossExposure => {
                    constraints.push((metric, Constraint::GrossExposure { limit }));
                }
            }
        }
        let variance_scale = if variance_scale > 0.0 && variance_scale.is_finite() {
            variance_scale
        } else {
            1.0
        };
        Ok(Self {
            multipliers: vec![0.0; constraints.len()],
            constraints,
            variance_scale,
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    fn normalized(&self, constraint: &Constraint, point: &RiskPoint<'_>) -> f64 {
        let g = constraint.value(point);
        if constraint.is_variance() {
            g / self.variance_scale
        } else {
            g
        }
    }

    /// Penalty value and gradient at `point` for penalty `rho`.
    pub(crate) fn evaluate(&self, point: &RiskPoint<'_>, rho: f64) -> (f64, DVector<f64>) {
        let mut value = 0.0;
        let mut gradient = DVector::zeros(point.weights.len());
        for ((_, constraint), lambda) in self.constraints.iter().zip(&self.multipliers) {
            let g = self.normalized(constraint, point);
            let s = (lambda + rho * g).max(0.0);
            value += (s * s - lambda * lambda) / (2.0 * rho);
            if s > 0.0 {
                let mut dg = constraint.gradient(point);
                if constraint.is_variance() {
                    dg /= self.variance_scale;
                }
                gradient += dg * s;
            }
        }
        (value, gradient)
    }

    /// Largest normalized violation and the limit it belongs to.
    pub(crate) fn max_violation(&self, point: &RiskPoint<'_>) -> (f64, Option<LimitMetric>) {
        self.constraints
            .iter()
            .map(|(metric, c)| (self.normalized(c, point).max(0.0), *metric))
            .fold((0.0, None), |(worst, at), (g, metric)| {
                if g > worst {
                    (g, Some(metric))
                } else {
                    (worst, at)
                }
            })
    }

    /// First-order multiplier update `λ ← max(0, λ + ρg)`.
    pub(crate) fn update_multipliers(&mut self, point: &RiskPoint<'_>, rho: f64) {
        for i in 0..self.constraints.len() {
            let g = self.normalized(&self.constraints[i].1, point);
            self.multipliers[i] = (self.multipliers[i] + rho * g).max(0.0);
        }
    }

    #[cfg(test)]
    pub(crate) fn multipliers(&self) -> &[f64] {
        &self.multipliers
    }
}

fn kind_mask(model: &FactorRiskModel, kind: FactorKind) -> DVector<f64> {
    DVector::from_iterator(
        model.factors().len(),
        model
            .factors()
            .iter()
            .map(|f| if f.kind() == kind { 1.0 } else { 0.0 }),
    )
}
