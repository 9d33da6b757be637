//! Augmented Lagrangian weight optimizer.

use factorlens_core::config::OptimizerConfig;
use factorlens_core::types::{
    validate_holdings, AssetFactorModel, FactorCovariance, Holding, RiskLimitSet,
};
use factorlens_core::{RiskError, RiskResult};
use factorlens_math::optimization::{
    project_bounded_simplex, projected_gradient, DescentConfig, StopReason,
};
use factorlens_math::solvers::SolverConfig;
use factorlens_portfolio::{aggregate, evaluate, FactorRiskModel, RiskCheckResult};
use nalgebra::DVector;
use tracing::{debug, info, warn};

use crate::bounds::{WeightBounds, WeightScaling};
use crate::cancel::CancellationFlag;
use crate::objective::Objective;
use crate::penalty::{Penalty, RiskPoint};
use crate::result::{OptimizationDiagnostics, OptimizationResult, OptimizationStatus};

/// Net exposure below which the starting point falls back to equal weights.
const NET_EPSILON: f64 = 1e-12;

/// Penalty grows unless a round cuts the worst violation below this fraction.
const PROGRESS_RATIO: f64 = 0.25;

/// A round that keeps more than this fraction of the violation has stalled.
const STALL_RATIO: f64 = 0.9;

/// Consecutive stalled rounds before the limits are declared infeasible.
const MAX_STALLED_ROUNDS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Initialized,
    Solving { round: u32, penalty: f64 },
}

/// Solves portfolio weights for an [`Objective`] under risk limits.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
    scaling: WeightScaling,
    cancellation: CancellationFlag,
}

impl Optimizer {
    /// Creates an optimizer reporting normalized weights.
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            scaling: WeightScaling::Normalized,
            cancellation: CancellationFlag::new(),
        }
    }

    /// Sets how solved weights are reported.
    #[must_use]
    pub fn with_scaling(mut self, scaling: WeightScaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Uses `flag` for cooperative cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Iteration and penalty settings.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Handle to this optimizer's cancellation flag.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Solves weights for `holdings`.
    ///
    /// Inputs that cannot be optimized at all (missing models or expected
    /// returns, malformed bounds or limits) are errors. Every other outcome
    /// is a status in the returned result.
    pub fn optimize(
        &self,
        objective: &Objective,
        holdings: &[Holding],
        models: &[AssetFactorModel],
        covariance: &FactorCovariance,
        limits: &RiskLimitSet,
        bounds: &WeightBounds,
    ) -> RiskResult<OptimizationResult> {
        validate_holdings(holdings)?;
        limits.validate()?;
        bounds.validate()?;

        let model = FactorRiskModel::new(holdings, models, covariance)?;
        let tickers = model.tickers().to_vec();
        let expected = objective.expected_returns(&tickers)?;

        let net: f64 = holdings.iter().map(|h| h.weight).sum();
        let scale = match self.scaling {
            WeightScaling::Normalized => 1.0,
            WeightScaling::Original if net > NET_EPSILON => net,
            WeightScaling::Original => {
                return Err(RiskError::configuration(format!(
                    "cannot rescale weights to a net exposure of {net}"
                )))
            }
        };
        let internal = internal_limits(limits, scale, self.config.feasibility_tolerance);
        let start = starting_point(holdings, net);
        let start_variance = RiskPoint::new(&model, DVector::from_column_slice(&start)).variance();
        let mut penalty = Penalty::new(&model, &internal, covariance, start_variance)?;

        let mut state = State::Initialized;
        info!(
            objective = objective.name(),
            holdings = holdings.len(),
            limits = limits.entries().len(),
            "optimization started"
        );

        let mut diagnostics = OptimizationDiagnostics {
            iterations: 0,
            penalty_rounds: 0,
            final_penalty: 0.0,
            gradient_norm: f64::INFINITY,
            max_violation: 0.0,
            message: None,
        };

        let (lower, upper) = match bounds.resolve(&tickers, internal.max_position_weight) {
            Ok(b) => b,
            Err(constraint) => {
                warn!(%constraint, "weight box cannot sum to one");
                diagnostics.message = Some(format!("{constraint} leave no weights summing to one"));
                return Ok(OptimizationResult {
                    objective: objective.name().to_string(),
                    status: OptimizationStatus::Infeasible { constraint },
                    weights: Vec::new(),
                    objective_value: None,
                    checks: RiskCheckResult::default(),
                    diagnostics,
                    summary: None,
                });
            }
        };

        let solver = SolverConfig::new(1e-15, 200);
        let project = |v: &[f64]| project_bounded_simplex(v, &lower, &upper, 1.0, &solver);
        let mut x = project(&start)?;

        let mut rho = self.config.initial_penalty;
        let mut previous = f64::INFINITY;
        let mut stalled_rounds = 0;
        let status = loop {
            let remaining = self.config.max_iterations.saturating_sub(diagnostics.iterations);
            if remaining == 0 {
                break OptimizationStatus::MaxIterationsExceeded;
            }

            let round = diagnostics.penalty_rounds + 1;
            debug!(?state, round, penalty = rho, "penalty round");
            state = State::Solving { round, penalty: rho };
            diagnostics.penalty_rounds = round;
            diagnostics.final_penalty = rho;

            let f = |v: &[f64]| {
                objective_and_gradient(&model, &penalty, expected.as_ref(), v, rho)
            };
            let descent = DescentConfig::default()
                .with_tolerance(self.config.tolerance)
                .with_max_iterations(remaining);
            let run = projected_gradient(f, &project, &x, &descent, || {
                self.cancellation.is_cancelled()
            })?;

            diagnostics.iterations += run.iterations;
            diagnostics.gradient_norm = run.gradient_norm;
            x = run.parameters;

            match run.stop_reason {
                StopReason::Interrupted => break OptimizationStatus::Cancelled,
                StopReason::MaxIterations => break OptimizationStatus::MaxIterationsExceeded,
                StopReason::Stalled => debug!(round, "line search stalled; treating as stationary"),
                StopReason::Converged => {}
            }

            let (excess, violated) =
                violations(&tickers, &x, models, covariance, &internal, &self.config)?;
            diagnostics.max_violation = excess;
            if violated.is_empty() {
                break OptimizationStatus::Converged;
            }
            if penalty.is_empty() {
                break OptimizationStatus::Infeasible {
                    constraint: violated.join(", "),
                };
            }

            let point = RiskPoint::new(&model, DVector::from_column_slice(&x));
            let (violation, worst) = penalty.max_violation(&point);
            stalled_rounds = if violation > STALL_RATIO * previous {
                stalled_rounds + 1
            } else {
                0
            };
            if rho >= self.config.max_penalty || stalled_rounds >= MAX_STALLED_ROUNDS {
                debug!(round, violation, stalled_rounds, ?worst, "limits cannot be met");
                break OptimizationStatus::Infeasible {
                    constraint: violated.join(", "),
                };
            }

            penalty.update_multipliers(&point, rho);
            if violation > PROGRESS_RATIO * previous {
                rho = (rho * self.config.penalty_growth).min(self.config.max_penalty);
            }
            previous = violation;
        };

        match state {
            State::Initialized => debug!(%status, "solver finished before the first round"),
            State::Solving { round, penalty } => {
                debug!(round, penalty, %status, "solver finished");
            }
        }
        self.finish(
            objective,
            status,
            &tickers,
            &x,
            scale,
            expected.as_ref(),
            models,
            covariance,
            limits,
            diagnostics,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        objective: &Objective,
        status: OptimizationStatus,
        tickers: &[String],
        x: &[f64],
        scale: f64,
        expected: Option<&DVector<f64>>,
        models: &[AssetFactorModel],
        covariance: &FactorCovariance,
        limits: &RiskLimitSet,
        mut diagnostics: OptimizationDiagnostics,
    ) -> RiskResult<OptimizationResult> {
        let solved = holdings_at(tickers, x, scale);
        let summary = aggregate(&solved, models, covariance)?;
        let checks = evaluate(&summary, limits)?;

        diagnostics.message = match &status {
            OptimizationStatus::Converged => None,
            OptimizationStatus::Infeasible { constraint } => Some(format!(
                "{constraint} still violated by {:.3e} at penalty {:.1e}",
                diagnostics.max_violation, diagnostics.final_penalty
            )),
            OptimizationStatus::MaxIterationsExceeded => Some(format!(
                "stopped after {} iterations with gradient norm {:.3e}",
                diagnostics.iterations, diagnostics.gradient_norm
            )),
            OptimizationStatus::Cancelled => Some(format!(
                "cancelled after {} iterations",
                diagnostics.iterations
            )),
        };

        if let OptimizationStatus::Infeasible { constraint } = &status {
            warn!(%constraint, violation = diagnostics.max_violation, "optimization infeasible");
            return Ok(OptimizationResult {
                objective: objective.name().to_string(),
                status,
                weights: Vec::new(),
                objective_value: None,
                checks,
                diagnostics,
                summary: None,
            });
        }

        let objective_value = match expected {
            Some(mu) => solved.iter().zip(mu.iter()).map(|(h, m)| h.weight * m).sum(),
            None => summary.total_variance,
        };
        info!(
            %status,
            iterations = diagnostics.iterations,
            objective_value,
            volatility = summary.volatility,
            "optimization finished"
        );

        Ok(OptimizationResult {
            objective: objective.name().to_string(),
            status,
            weights: solved,
            objective_value: Some(objective_value),
            checks,
            diagnostics,
            summary: Some(summary),
        })
    }
}

/// Normalized starting weights; equal weights when the net is ~0.
fn starting_point(holdings: &[Holding], net: f64) -> Vec<f64> {
    if net.abs() < NET_EPSILON {
        let n = holdings.len() as f64;
        return vec![1.0 / n; holdings.len()];
    }
    holdings.iter().map(|h| h.weight / net).collect()
}

fn holdings_at(tickers: &[String], x: &[f64], scale: f64) -> Vec<Holding> {
    tickers
        .iter()
        .zip(x)
        .map(|(t, w)| Holding::new(t.clone(), w * scale))
        .collect()
}

/// Limits in normalized-weight units, shrunk by twice the feasibility
/// tolerance so an iterate within tolerance of them passes the caller's.
///
/// Position and gross limits are not shrunk: the position limit is enforced
/// exactly by the box, and gross exposure is at least one by construction.
fn internal_limits(limits: &RiskLimitSet, scale: f64, tolerance: f64) -> RiskLimitSet {
    let shrink = |v: f64| (v - 2.0 * tolerance).max(0.0);
    RiskLimitSet {
        max_volatility: limits.max_volatility.map(|v| shrink(v / scale)),
        max_position_weight: limits.max_position_weight.map(|v| v / scale),
        max_factor_share: limits.max_factor_share.map(shrink),
        max_market_share: limits.max_market_share.map(shrink),
        max_industry_share: limits.max_industry_share.map(shrink),
        max_single_factor_loss: limits.max_single_factor_loss.map(|v| shrink(v / scale)),
        max_gross_exposure: limits.max_gross_exposure.map(|v| v / scale),
    }
}

fn objective_and_gradient(
    model: &FactorRiskModel,
    penalty: &Penalty,
    expected: Option<&DVector<f64>>,
    x: &[f64],
    rho: f64,
) -> (f64, Vec<f64>) {
    let point = RiskPoint::new(model, DVector::from_column_slice(x));
    let (value, gradient) = match expected {
        Some(mu) => (-mu.dot(point.weights()), -mu.clone()),
        None => (point.variance(), point.variance_gradient()),
    };
    let (p, dp) = penalty.evaluate(&point, rho);
    (value + p, (gradient + dp).as_slice().to_vec())
}

/// Largest excess over the internal limits and the names of limits
/// exceeded by more than the feasibility tolerance.
fn violations(
    tickers: &[String],
    x: &[f64],
    models: &[AssetFactorModel],
    covariance: &FactorCovariance,
    limits: &RiskLimitSet,
    config: &OptimizerConfig,
) -> RiskResult<(f64, Vec<String>)> {
    let summary = aggregate(&holdings_at(tickers, x, 1.0), models, covariance)?;
    let checks = evaluate(&summary, limits)?;
    let worst = checks.checks.iter().map(|c| c.excess()).fold(0.0, f64::max);
    let violated = checks
        .checks
        .iter()
        .filter(|c| c.excess() > config.feasibility_tolerance)
        .map(|c| c.metric.limit_name().to_string())
        .collect();
    Ok((worst, violated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_point() {
        let holdings = vec![Holding::new("A", 2.0), Holding::new("B", 2.0)];
        assert_eq!(starting_point(&holdings, 4.0), vec![0.5, 0.5]);

        let hedged = vec![Holding::new("A", 1.0), Holding::new("B", -1.0)];
        assert_eq!(starting_point(&hedged, 0.0), vec![0.5, 0.5]);
    }

    #[test]
    fn test_internal_limits_scale_absolute_metrics() {
        let limits = RiskLimitSet::new()
            .with_max_volatility(0.2)
            .with_max_position_weight(0.4)
            .with_max_market_share(0.5);
        let internal = internal_limits(&limits, 2.0, 0.0);
        assert_eq!(internal.max_volatility, Some(0.1));
        assert_eq!(internal.max_position_weight, Some(0.2));
        assert_eq!(internal.max_market_share, Some(0.5));
    }
}
