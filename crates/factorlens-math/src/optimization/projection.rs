//! Euclidean projection onto a box-constrained simplex.

use crate::error::{MathError, MathResult};
use crate::solvers::{bisection, SolverConfig};

/// Projects `v` onto `{x : lower <= x <= upper, Σx = total}`.
///
/// The projection is `x_i = clamp(v_i - λ, lower_i, upper_i)` for the shift
/// `λ` that makes the coordinates sum to `total`. The sum is monotone in `λ`,
/// so `λ` is found by bisection over `[min(v - upper), max(v - lower)]`.
/// The bisection tolerance is taken relative to the bracket magnitude.
///
/// Fails when the box cannot reach `total`.
pub fn project_bounded_simplex(
    v: &[f64],
    lower: &[f64],
    upper: &[f64],
    total: f64,
    config: &SolverConfig,
) -> MathResult<Vec<f64>> {
    let n = v.len();
    if lower.len() != n || upper.len() != n {
        return Err(MathError::ShapeMismatch {
            left: (n, 1),
            right: (lower.len().min(upper.len()), 1),
        });
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(MathError::invalid_input("cannot project non-finite point"));
    }
    if lower.iter().zip(upper).any(|(l, u)| l > u) {
        return Err(MathError::invalid_input("lower bound exceeds upper bound"));
    }

    let lower_sum: f64 = lower.iter().sum();
    let upper_sum: f64 = upper.iter().sum();
    let slack = config.tolerance * (n.max(1) as f64);
    if lower_sum > total + slack || upper_sum < total - slack {
        return Err(MathError::invalid_input(format!(
            "bounds sum to [{lower_sum}, {upper_sum}] and cannot reach {total}"
        )));
    }

    let clamped = |lambda: f64| -> Vec<f64> {
        v.iter()
            .zip(lower.iter().zip(upper))
            .map(|(x, (l, u))| (x - lambda).clamp(*l, *u))
            .collect()
    };
    let excess = |lambda: f64| clamped(lambda).iter().sum::<f64>() - total;

    if n == 0 {
        return Ok(Vec::new());
    }

    let lo = v
        .iter()
        .zip(upper)
        .map(|(x, u)| x - u)
        .fold(f64::INFINITY, f64::min);
    let hi = v
        .iter()
        .zip(lower)
        .map(|(x, l)| x - l)
        .fold(f64::NEG_INFINITY, f64::max);

    let scaled = config.with_tolerance(config.tolerance * (1.0 + lo.abs().max(hi.abs())));
    let lambda = match bisection(excess, lo, hi, &scaled) {
        Ok(result) => result.root,
        // Bounds were within slack of total; one end of the bracket is the answer.
        Err(MathError::InvalidBracket { a, b, fa, fb }) => {
            if fa.abs() <= fb.abs() {
                a
            } else {
                b
            }
        }
        Err(e) => return Err(e),
    };

    let mut x = clamped(lambda);
    spread_residual(&mut x, lower, upper, total);
    Ok(x)
}

/// Spreads the remaining `total - Σx` over coordinates with room to move.
fn spread_residual(x: &mut [f64], lower: &[f64], upper: &[f64], total: f64) {
    let residual = total - x.iter().sum::<f64>();
    if residual == 0.0 {
        return;
    }
    let free: Vec<usize> = (0..x.len())
        .filter(|&i| {
            if residual > 0.0 {
                x[i] < upper[i]
            } else {
                x[i] > lower[i]
            }
        })
        .collect();
    if free.is_empty() {
        return;
    }
    let share = residual / free.len() as f64;
    for i in free {
        x[i] = (x[i] + share).clamp(lower[i], upper[i]);
    }
}
