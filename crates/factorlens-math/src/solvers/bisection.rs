//! Interval halving.

use crate::error::{MathError, MathResult};
use crate::solvers::{SolverConfig, SolverResult};

/// Finds a zero of `f` on `[a, b]` by halving the interval.
///
/// The endpoints may be given in either order. `f(a)` and `f(b)` must not
/// share a sign, otherwise [`MathError::InvalidBracket`] carries both values
/// back so the caller can pick the closer end.
///
/// # Example
///
/// ```rust
/// use factorlens_math::solvers::{bisection, SolverConfig};
///
/// // Shift that makes clamp(v - λ, 0, 1) sum to one for v = [0.9, 0.6, 0.0].
/// let excess = |lambda: f64| {
///     [0.9_f64, 0.6, 0.0]
///         .iter()
///         .map(|v| (v - lambda).clamp(0.0, 1.0))
///         .sum::<f64>()
///         - 1.0
/// };
/// let result = bisection(excess, -1.0, 1.0, &SolverConfig::default()).unwrap();
/// assert!((result.root - 0.25).abs() < 1e-9);
/// ```
pub fn bisection<F>(f: F, a: f64, b: f64, config: &SolverConfig) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
{
    let mut lo = a.min(b);
    let mut hi = a.max(b);

    let mut f_lo = f(lo);
    let f_hi = f(hi);

    if f_lo * f_hi > 0.0 {
        return Err(MathError::InvalidBracket {
            a: lo,
            b: hi,
            fa: f_lo,
            fb: f_hi,
        });
    }

    if f_lo.abs() < config.tolerance {
        return Ok(SolverResult {
            root: lo,
            iterations: 0,
            residual: f_lo,
        });
    }
    if f_hi.abs() < config.tolerance {
        return Ok(SolverResult {
            root: hi,
            iterations: 0,
            residual: f_hi,
        });
    }

    for iteration in 0..config.max_iterations {
        let mid = (lo + hi) / 2.0;
        let f_mid = f(mid);

        if f_mid.abs() < config.tolerance || (hi - lo) / 2.0 < config.tolerance {
            return Ok(SolverResult {
                root: mid,
                iterations: iteration + 1,
                residual: f_mid,
            });
        }

        if f_mid * f_lo < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    let mid = (lo + hi) / 2.0;
    Err(MathError::NoConvergence {
        iterations: config.max_iterations,
        residual: f(mid).abs(),
    })
}
