//! Failures raised by the numerical kernels.
//!
//! The engine folds these into `RiskError::Math`, so messages name the
//! numerical problem and leave the holding or factor context to the caller.

use thiserror::Error;

/// Result alias used across the kernels.
pub type MathResult<T> = Result<T, MathError>;

/// A numerical kernel could not produce an answer.
#[derive(Error, Debug, Clone)]
pub enum MathError {
    /// Bisection ran out of iterations before the shift settled.
    #[error("root search stopped after {iterations} iterations with |f| = {residual:.2e}")]
    NoConvergence {
        /// Iterations spent.
        iterations: u32,
        /// `|f|` at the last midpoint.
        residual: f64,
    },

    /// Both ends of the search interval have the same sign.
    ///
    /// The simplex projection treats this as "one end is already the answer"
    /// when its bounds are within slack of the target sum.
    #[error("no sign change on [{a}, {b}]: f(a) = {fa:.2e}, f(b) = {fb:.2e}")]
    InvalidBracket {
        /// Left end.
        a: f64,
        /// Right end.
        b: f64,
        /// `f(a)`.
        fa: f64,
        /// `f(b)`.
        fb: f64,
    },

    /// Operand shapes do not line up, as `(rows, cols)`.
    #[error("shape {left:?} does not line up with {right:?}")]
    ShapeMismatch {
        /// Matrix operand.
        left: (usize, usize),
        /// Vector or second operand.
        right: (usize, usize),
    },

    /// A covariance matrix has an eigenvalue below the allowed floor.
    #[error("covariance is not positive semi-definite (smallest eigenvalue {min_eigenvalue:.3e})")]
    NotPositiveSemiDefinite {
        /// Smallest eigenvalue.
        min_eigenvalue: f64,
    },

    /// Too few observations for the estimate.
    #[error("need {required} observations, have {actual}")]
    InsufficientData {
        /// Observations the estimate needs.
        required: usize,
        /// Observations supplied.
        actual: usize,
    },

    /// Non-finite values, inverted bounds and similar caller mistakes.
    #[error("bad kernel input: {reason}")]
    InvalidInput {
        /// What was wrong.
        reason: String,
    },
}

impl MathError {
    /// Shorthand for [`MathError::InvalidInput`].
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`MathError::InsufficientData`].
    #[must_use]
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }
}
