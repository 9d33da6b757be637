//! Optimization algorithms.
//!
//! Accelerated projected gradient descent over a convex feasible set, plus
//! the bounded-simplex projection used for portfolio weights.

mod projection;

pub use projection::project_bounded_simplex;

use crate::error::MathResult;

/// Configuration for projected gradient descent.
#[derive(Debug, Clone, Copy)]
pub struct DescentConfig {
    /// Convergence tolerance on the projected gradient norm, relative to
    /// `1 + |∇f|`.
    pub tolerance: f64,
    /// Convergence tolerance on the length of an accepted step.
    pub step_tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
    /// Starting step length.
    pub initial_step: f64,
    /// Step length below which the search is declared stalled.
    pub min_step: f64,
    /// Upper bound on the step length.
    pub max_step: f64,
}

impl Default for DescentConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            step_tolerance: 1e-13,
            max_iterations: 1_000,
            initial_step: 1.0,
            min_step: 1e-16,
            max_step: 1e4,
        }
    }
}

impl DescentConfig {
    /// Sets the gradient tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the starting step length.
    #[must_use]
    pub fn with_initial_step(mut self, initial_step: f64) -> Self {
        self.initial_step = initial_step;
        self
    }
}

/// Why a descent run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Projected gradient or step length fell below tolerance.
    Converged,
    /// Iteration budget exhausted.
    MaxIterations,
    /// Line search could not find an acceptable step.
    Stalled,
    /// The interrupt callback asked to stop.
    Interrupted,
}

/// Result of a descent run.
#[derive(Debug, Clone)]
pub struct DescentResult {
    /// Final (best) parameters.
    pub parameters: Vec<f64>,
    /// Objective value at `parameters`.
    pub objective_value: f64,
    /// Last projected gradient norm observed.
    pub gradient_norm: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Why the run stopped.
    pub stop_reason: StopReason,
}

impl DescentResult {
    /// Returns true if the run converged.
    pub fn converged(&self) -> bool {
        self.stop_reason == StopReason::Converged
    }
}

/// Minimizes `f` over the set defined by `project` with accelerated
/// projected gradient descent (FISTA with backtracking and restart).
///
/// `f` returns the objective value together with its gradient. `project`
/// maps any point onto the feasible set. `interrupt` is polled once per
/// iteration; returning true stops the run with the current iterate.
///
/// From the extrapolated point `y`, a step `z = P(y - t g)` is accepted when
/// `f(z) <= f(y) + g·(z - y) + |z - y|² / (2t)`; otherwise `t` is halved.
/// After an accepted step `t` doubles, capped at `max_step`. Momentum is
/// reset whenever an accepted step fails to improve on the last iterate, so
/// the returned objective never increases. The run converges when
/// `|z - y| / t <= tolerance * (1 + |g|)`.
pub fn projected_gradient<F, P, I>(
    f: F,
    project: P,
    initial: &[f64],
    config: &DescentConfig,
    interrupt: I,
) -> MathResult<DescentResult>
where
    F: Fn(&[f64]) -> (f64, Vec<f64>),
    P: Fn(&[f64]) -> MathResult<Vec<f64>>,
    I: Fn() -> bool,
{
    let mut x = project(initial)?;
    let (mut fx, _) = f(&x);
    let mut y = x.clone();
    let mut momentum = 1.0_f64;
    let mut step = config.initial_step;
    let mut gradient_norm = f64::INFINITY;

    for iteration in 0..config.max_iterations {
        if interrupt() {
            return finish(x, fx, gradient_norm, iteration, StopReason::Interrupted);
        }

        let (fy, grad) = f(&y);
        let scale = 1.0 + norm(&grad);

        let (z, fz) = loop {
            let trial: Vec<f64> = y.iter().zip(&grad).map(|(yi, gi)| yi - step * gi).collect();
            let z = project(&trial)?;
            let d: Vec<f64> = z.iter().zip(&y).map(|(zi, yi)| zi - yi).collect();
            let d_norm_sq: f64 = d.iter().map(|v| v * v).sum();

            gradient_norm = d_norm_sq.sqrt() / step;
            let (fz, _) = f(&z);
            if gradient_norm <= config.tolerance * scale {
                return if fz <= fx {
                    finish(z, fz, gradient_norm, iteration, StopReason::Converged)
                } else {
                    finish(x, fx, gradient_norm, iteration, StopReason::Converged)
                };
            }

            let decrease: f64 = grad.iter().zip(&d).map(|(g, di)| g * di).sum();
            if fz.is_finite() && fz <= fy + decrease + d_norm_sq / (2.0 * step) {
                break (z, fz);
            }

            step *= 0.5;
            if step < config.min_step {
                log::debug!("line search stalled at iteration {iteration}");
                return finish(x, fx, gradient_norm, iteration, StopReason::Stalled);
            }
        };

        if fz > fx {
            if momentum <= 1.0 {
                // No momentum to shed: the step is below rounding noise.
                log::debug!("no descent from the current iterate at iteration {iteration}");
                return finish(x, fx, gradient_norm, iteration, StopReason::Stalled);
            }
            momentum = 1.0;
            y.clone_from(&x);
            continue;
        }

        let moved = distance(&z, &x);
        let next = (1.0 + (1.0 + 4.0 * momentum * momentum).sqrt()) / 2.0;
        let beta = (momentum - 1.0) / next;
        y = z
            .iter()
            .zip(&x)
            .map(|(zi, xi)| zi + beta * (zi - xi))
            .collect();
        x = z;
        fx = fz;
        momentum = next;
        step = (step * 2.0).min(config.max_step);

        if moved <= config.step_tolerance {
            return finish(x, fx, gradient_norm, iteration + 1, StopReason::Converged);
        }
    }

    finish(
        x,
        fx,
        gradient_norm,
        config.max_iterations,
        StopReason::MaxIterations,
    )
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn finish(
    parameters: Vec<f64>,
    objective_value: f64,
    gradient_norm: f64,
    iterations: u32,
    stop_reason: StopReason,
) -> MathResult<DescentResult> {
    Ok(DescentResult {
        parameters,
        objective_value,
        gradient_norm,
        iterations,
        stop_reason,
    })
}
