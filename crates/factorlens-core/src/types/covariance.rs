//! Factor return covariance.

use factorlens_math::linear_algebra::{ensure_positive_semi_definite, max_asymmetry, symmetrize};
use nalgebra::DMatrix;
use serde::Serialize;
use std::collections::BTreeSet;

use super::{FactorId, Frequency};
use crate::error::{RiskError, RiskResult};

/// Relative tolerance for symmetry and PSD checks.
const COVARIANCE_TOLERANCE: f64 = 1e-10;

/// Symmetric positive semi-definite covariance of factor returns.
///
/// Rows and columns follow `factors()`. Per-factor worst and best period
/// returns over the estimation window are optional and feed the
/// single-factor loss metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorCovariance {
    factors: Vec<FactorId>,
    matrix: DMatrix<f64>,
    frequency: Frequency,
    observations: usize,
    worst_returns: Option<Vec<f64>>,
    best_returns: Option<Vec<f64>>,
}

impl FactorCovariance {
    /// Creates a validated covariance.
    ///
    /// The matrix must be square with one row per distinct factor, finite,
    /// symmetric up to rounding, and positive semi-definite. It is stored
    /// exactly symmetrized.
    pub fn new(
        factors: Vec<FactorId>,
        matrix: DMatrix<f64>,
        frequency: Frequency,
        observations: usize,
    ) -> RiskResult<Self> {
        let k = factors.len();
        if matrix.nrows() != k || matrix.ncols() != k {
            return Err(RiskError::configuration(format!(
                "covariance is {}x{} but {k} factors were named",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        let distinct: BTreeSet<&FactorId> = factors.iter().collect();
        if distinct.len() != k {
            return Err(RiskError::configuration(
                "covariance names a factor more than once",
            ));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::configuration("covariance has non-finite entries"));
        }
        let scale = matrix.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
        if max_asymmetry(&matrix) > COVARIANCE_TOLERANCE * scale {
            return Err(RiskError::configuration("covariance is not symmetric"));
        }
        let matrix = symmetrize(&matrix)?;
        ensure_positive_semi_definite(&matrix, COVARIANCE_TOLERANCE)?;

        Ok(Self {
            factors,
            matrix,
            frequency,
            observations,
            worst_returns: None,
            best_returns: None,
        })
    }

    /// Attaches per-factor worst and best period returns, in factor order.
    pub fn with_extremes(mut self, worst: Vec<f64>, best: Vec<f64>) -> RiskResult<Self> {
        let k = self.factors.len();
        if worst.len() != k || best.len() != k {
            return Err(RiskError::configuration(format!(
                "expected {k} worst/best returns, got {}/{}",
                worst.len(),
                best.len()
            )));
        }
        if worst.iter().zip(&best).any(|(w, b)| !(w <= b)) {
            return Err(RiskError::configuration(
                "worst return exceeds best return",
            ));
        }
        self.worst_returns = Some(worst);
        self.best_returns = Some(best);
        Ok(self)
    }

    /// Factors in row order.
    pub fn factors(&self) -> &[FactorId] {
        &self.factors
    }

    /// Number of factors.
    pub fn dimension(&self) -> usize {
        self.factors.len()
    }

    /// The covariance matrix (per period).
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Frequency of the underlying returns.
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Observations used in the estimate.
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Row index of `factor`.
    pub fn index_of(&self, factor: &FactorId) -> Option<usize> {
        self.factors.iter().position(|f| f == factor)
    }

    /// Covariance between two factors.
    pub fn covariance(&self, a: &FactorId, b: &FactorId) -> Option<f64> {
        Some(self.matrix[(self.index_of(a)?, self.index_of(b)?)])
    }

    /// Worst and best period return of the factor at `index`, if recorded.
    pub fn extremes(&self, index: usize) -> Option<(f64, f64)> {
        let worst = self.worst_returns.as_ref()?.get(index)?;
        let best = self.best_returns.as_ref()?.get(index)?;
        Some((*worst, *best))
    }

    /// Returns true if worst and best returns are recorded.
    pub fn has_extremes(&self) -> bool {
        self.worst_returns.is_some() && self.best_returns.is_some()
    }
}
