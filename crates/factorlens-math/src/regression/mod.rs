//! Ordinary least squares regression.
//!
//! The design matrix always carries an intercept column. The system is solved
//! through an SVD so that collinear regressors produce the minimum-norm
//! solution and a rank flag instead of a failure.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{MathError, MathResult};

/// Singular values below this fraction of the largest are treated as zero.
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Result of an OLS fit with intercept.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Intercept term.
    pub intercept: f64,
    /// Slope coefficients, one per regressor column.
    pub coefficients: Vec<f64>,
    /// Standard error per slope coefficient.
    pub standard_errors: Vec<f64>,
    /// t-statistic per slope coefficient (None when the standard error is zero).
    pub t_stats: Vec<Option<f64>>,
    /// Two-sided p-value per slope coefficient.
    pub p_values: Vec<Option<f64>>,
    /// Total sum of squares around the mean.
    pub total_sum_squares: f64,
    /// Explained sum of squares.
    pub explained_sum_squares: f64,
    /// Unexplained variance: (SST - ESS) / residual degrees of freedom, floored at zero.
    pub unexplained_variance: f64,
    /// True when the unexplained variance had to be floored at zero.
    pub unexplained_clamped: bool,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Number of observations.
    pub observations: usize,
    /// Numerical rank of the design matrix (intercept included).
    pub rank: usize,
    /// Residual degrees of freedom.
    pub residual_dof: usize,
}

impl OlsFit {
    /// Returns true when the design matrix was rank deficient.
    pub fn is_rank_deficient(&self) -> bool {
        self.rank < self.coefficients.len() + 1
    }
}

/// Regresses `y` on the columns of `x` plus an intercept.
///
/// Requires strictly more observations than parameters.
pub fn ols(y: &DVector<f64>, x: &DMatrix<f64>) -> MathResult<OlsFit> {
    let n = y.len();
    let k = x.ncols();
    let p = k + 1;

    if x.nrows() != n {
        return Err(MathError::ShapeMismatch {
            left: x.shape(),
            right: (n, 1),
        });
    }
    if n <= p {
        return Err(MathError::insufficient_data(p + 1, n));
    }
    if y.iter().chain(x.iter()).any(|v| !v.is_finite()) {
        return Err(MathError::invalid_input("regression inputs must be finite"));
    }

    let mut design = DMatrix::from_element(n, p, 1.0);
    design.view_mut((0, 1), (n, k)).copy_from(x);

    let svd = design.clone().svd(true, true);
    let max_sv = svd.singular_values.iter().copied().fold(0.0, f64::max);
    let eps = RANK_TOLERANCE * max_sv;
    let rank = svd.rank(eps);

    let beta = svd.solve(y, eps).map_err(MathError::invalid_input)?;

    let fitted = &design * &beta;
    let y_mean = y.mean();
    let total_ss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let explained_ss: f64 = fitted.iter().map(|v| (v - y_mean).powi(2)).sum();

    let residual_dof = n - rank;
    let raw_unexplained = (total_ss - explained_ss) / residual_dof as f64;
    let unexplained_clamped = !(raw_unexplained >= 0.0);
    let unexplained_variance = if unexplained_clamped {
        log::debug!("unexplained variance {raw_unexplained:.3e} floored at zero");
        0.0
    } else {
        raw_unexplained
    };

    let r_squared = if total_ss > 0.0 {
        (1.0 - (total_ss - explained_ss).max(0.0) / total_ss).clamp(0.0, 1.0)
    } else {
        0.0
    };

    // diag((XᵀX)⁺) from the SVD: Σ_i v_ij² / s_i²
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| MathError::invalid_input("SVD did not produce V"))?;
    let mut pinv_diag = vec![0.0; p];
    for (i, s) in svd.singular_values.iter().enumerate() {
        if *s > eps {
            for (j, d) in pinv_diag.iter_mut().enumerate() {
                *d += v_t[(i, j)].powi(2) / (s * s);
            }
        }
    }

    let t_dist = StudentsT::new(0.0, 1.0, residual_dof as f64).ok();
    let mut coefficients = Vec::with_capacity(k);
    let mut standard_errors = Vec::with_capacity(k);
    let mut t_stats = Vec::with_capacity(k);
    let mut p_values = Vec::with_capacity(k);

    for j in 1..p {
        let coef = beta[j];
        let se = (unexplained_variance * pinv_diag[j]).sqrt();
        let t = if se > 0.0 { Some(coef / se) } else { None };
        let p_value = match (t, t_dist.as_ref()) {
            (Some(t), Some(dist)) => Some(2.0 * (1.0 - dist.cdf(t.abs()))),
            _ => None,
        };
        coefficients.push(coef);
        standard_errors.push(se);
        t_stats.push(t);
        p_values.push(p_value);
    }

    Ok(OlsFit {
        intercept: beta[0],
        coefficients,
        standard_errors,
        t_stats,
        p_values,
        total_sum_squares: total_ss,
        explained_sum_squares: explained_ss,
        unexplained_variance,
        unexplained_clamped,
        r_squared,
        observations: n,
        rank,
        residual_dof,
    })
}
