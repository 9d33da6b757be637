//! Linear algebra utilities.
//!
//! Small helpers around nalgebra used by the covariance estimator, the
//! aggregator and the optimizer.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Returns `(m + mᵀ) / 2`.
pub fn symmetrize(m: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    if m.nrows() != m.ncols() {
        return Err(MathError::invalid_input("Matrix must be square to symmetrize"));
    }
    Ok((m + m.transpose()) * 0.5)
}

/// Largest absolute asymmetry `|m[i,j] - m[j,i]|`.
pub fn max_asymmetry(m: &DMatrix<f64>) -> f64 {
    let n = m.nrows().min(m.ncols());
    let mut worst = 0.0_f64;
    for i in 0..n {
        for j in (i + 1)..n {
            worst = worst.max((m[(i, j)] - m[(j, i)]).abs());
        }
    }
    worst
}

/// Smallest eigenvalue of a symmetric matrix.
pub fn min_eigenvalue(m: &DMatrix<f64>) -> MathResult<f64> {
    if m.nrows() != m.ncols() {
        return Err(MathError::invalid_input("Matrix must be square"));
    }
    if m.nrows() == 0 {
        return Ok(0.0);
    }
    let eigen = SymmetricEigen::new(m.clone());
    Ok(eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Fails unless every eigenvalue is above `-tolerance * scale`, where scale is
/// the largest diagonal magnitude (at least 1).
pub fn ensure_positive_semi_definite(m: &DMatrix<f64>, tolerance: f64) -> MathResult<()> {
    let min_eig = min_eigenvalue(m)?;
    let scale = m
        .diagonal()
        .iter()
        .fold(1.0_f64, |acc, d| acc.max(d.abs()));
    if min_eig < -tolerance * scale {
        log::debug!("PSD check failed: min eigenvalue {min_eig:.3e}");
        return Err(MathError::NotPositiveSemiDefinite {
            min_eigenvalue: min_eig,
        });
    }
    Ok(())
}

/// Maximum absolute row sum, an upper bound on the spectral norm.
pub fn max_abs_row_sum(m: &DMatrix<f64>) -> f64 {
    m.row_iter()
        .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Computes `vᵀ m v`.
pub fn quadratic_form(m: &DMatrix<f64>, v: &DVector<f64>) -> MathResult<f64> {
    if m.nrows() != m.ncols() || m.ncols() != v.len() {
        return Err(MathError::ShapeMismatch {
            left: m.shape(),
            right: (v.len(), 1),
        });
    }
    Ok(v.dot(&(m * v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_symmetrize() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 4.0, 3.0]);
        let s = symmetrize(&m).unwrap();
        assert_relative_eq!(s[(0, 1)], 3.0);
        assert_relative_eq!(s[(1, 0)], 3.0);
        assert_eq!(max_asymmetry(&s), 0.0);
        assert_relative_eq!(max_asymmetry(&m), 2.0);
    }

    #[test]
    fn test_psd_check() {
        let psd = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]);
        assert!(ensure_positive_semi_definite(&psd, 1e-10).is_ok());

        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            ensure_positive_semi_definite(&indefinite, 1e-10),
            Err(MathError::NotPositiveSemiDefinite { .. })
        ));
    }

    #[test]
    fn test_quadratic_form() {
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let v = DVector::from_vec(vec![1.0, 2.0]);
        // 2 + 2*1*2 + 3*4 = 18
        assert_relative_eq!(quadratic_form(&m, &v).unwrap(), 18.0);
        assert_relative_eq!(max_abs_row_sum(&m), 4.0);
    }
}
