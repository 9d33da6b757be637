//! Optimizer outcomes.

use std::fmt;

use factorlens_core::types::Holding;
use factorlens_core::{RiskError, RiskResult};
use factorlens_portfolio::{PortfolioRiskSummary, RiskCheckResult};
use serde::{Deserialize, Serialize};

/// Terminal state of an optimization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizationStatus {
    /// Stationary point found with every limit satisfied.
    Converged,
    /// No weights satisfy the bounds and limits.
    Infeasible {
        /// Violated constraint names, comma separated.
        constraint: String,
    },
    /// The iteration budget ran out before convergence.
    MaxIterationsExceeded,
    /// The cancellation flag was raised.
    Cancelled,
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStatus::Converged => f.write_str("converged"),
            OptimizationStatus::Infeasible { constraint } => write!(f, "infeasible ({constraint})"),
            OptimizationStatus::MaxIterationsExceeded => f.write_str("max iterations exceeded"),
            OptimizationStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Iteration statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationDiagnostics {
    /// Descent iterations across all penalty rounds.
    pub iterations: u32,
    /// Penalty rounds started.
    pub penalty_rounds: u32,
    /// Penalty weight of the last round.
    pub final_penalty: f64,
    /// Last projected-gradient norm.
    pub gradient_norm: f64,
    /// Largest limit excess at the last iterate (0 when feasible).
    pub max_violation: f64,
    /// Human-readable note for non-converged runs.
    pub message: Option<String>,
}

/// Result of [`Optimizer::optimize`](crate::Optimizer::optimize).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Objective name.
    pub objective: String,
    /// Terminal state.
    pub status: OptimizationStatus,
    /// Solved weights in holding order. Empty when infeasible.
    pub weights: Vec<Holding>,
    /// Objective at `weights`: annualized variance or expected return.
    pub objective_value: Option<f64>,
    /// Limits evaluated at the last iterate.
    pub checks: RiskCheckResult,
    /// Iteration statistics.
    pub diagnostics: OptimizationDiagnostics,
    /// Risk summary at `weights`. Absent when infeasible.
    pub summary: Option<PortfolioRiskSummary>,
}

impl OptimizationResult {
    /// Returns true if the run converged.
    pub fn is_converged(&self) -> bool {
        self.status == OptimizationStatus::Converged
    }

    /// Solved weight for `ticker`.
    pub fn weight(&self, ticker: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|h| h.ticker == ticker)
            .map(|h| h.weight)
    }

    /// Converts non-converged states into errors.
    ///
    /// `Infeasible` becomes `InfeasibleConstraints`; running out of
    /// iterations and cancellation become `NonConvergence`.
    pub fn into_result(self) -> RiskResult<Self> {
        let iterations = self.diagnostics.iterations;
        match &self.status {
            OptimizationStatus::Converged => Ok(self),
            OptimizationStatus::Infeasible { constraint } => {
                Err(RiskError::infeasible(constraint.clone()))
            }
            OptimizationStatus::MaxIterationsExceeded => Err(RiskError::non_convergence(
                iterations,
                "iteration budget exhausted",
            )),
            OptimizationStatus::Cancelled => {
                Err(RiskError::non_convergence(iterations, "cancelled"))
            }
        }
    }
}
