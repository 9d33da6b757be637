//! Sample statistics.

use nalgebra::DMatrix;

use crate::error::{MathError, MathResult};

/// Arithmetic mean. Returns 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (n - 1 denominator).
pub fn sample_variance(values: &[f64]) -> MathResult<f64> {
    if values.len() < 2 {
        return Err(MathError::insufficient_data(2, values.len()));
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Ok(ss / (values.len() - 1) as f64)
}

/// Sample covariance matrix of the columns of `data` (observations in rows).
///
/// The result is exactly symmetric: each off-diagonal entry is computed once
/// and mirrored.
pub fn sample_covariance(data: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    let n = data.nrows();
    let k = data.ncols();
    if n < 2 {
        return Err(MathError::insufficient_data(2, n));
    }

    let means: Vec<f64> = (0..k).map(|j| data.column(j).mean()).collect();
    let denom = (n - 1) as f64;
    let mut cov = DMatrix::zeros(k, k);

    for a in 0..k {
        for b in a..k {
            let mut acc = 0.0;
            for t in 0..n {
                acc += (data[(t, a)] - means[a]) * (data[(t, b)] - means[b]);
            }
            let value = acc / denom;
            cov[(a, b)] = value;
            cov[(b, a)] = value;
        }
    }

    Ok(cov)
}
