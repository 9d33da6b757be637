//! One-dimensional root search for the weight projection.
//!
//! The bounded-simplex projection needs the shift `λ` at which the clamped
//! weights sum to the target exposure. That sum is monotone in `λ`, so a
//! bracketing search is enough and no derivative is required.

mod bisection;

pub use bisection::bisection;

/// Stopping rule for [`bisection`].
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Stop once `|f|` or the half-width of the interval drops below this.
    pub tolerance: f64,
    /// Halvings allowed before giving up.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
        }
    }
}

impl SolverConfig {
    /// Explicit tolerance and iteration budget.
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Same iteration budget, different tolerance. The projection rescales
    /// the tolerance to the size of its bracket.
    #[must_use]
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self { tolerance, ..self }
    }
}

/// Where a search stopped.
#[derive(Debug, Clone, Copy)]
pub struct SolverResult {
    /// Located shift.
    pub root: f64,
    /// Halvings performed (0 when an endpoint already satisfied the tolerance).
    pub iterations: u32,
    /// `f(root)`.
    pub residual: f64,
}
