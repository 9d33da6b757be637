//! # factorlens Math
//!
//! Numerical kernels for the factorlens risk engine.
//!
//! This crate provides:
//!
//! - **Regression**: Ordinary least squares via SVD with fit diagnostics
//! - **Statistics**: Means, variances and sample covariance matrices
//! - **Linear Algebra**: Symmetrization, PSD checks, quadratic forms
//! - **Solvers**: Bracketing root finder used by the weight projection
//! - **Optimization**: Projected gradient descent and bounded-simplex projection
//!
//! ## Design Philosophy
//!
//! - **Numerical Stability**: Rank-deficient designs are solved, not rejected
//! - **Pure Functions**: No I/O, no global state
//! - **f64 Throughout**: Statistical estimates do not benefit from decimals

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod linear_algebra;
pub mod optimization;
pub mod regression;
pub mod solvers;
pub mod statistics;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::{
        ensure_positive_semi_definite, max_abs_row_sum, quadratic_form, symmetrize,
    };
    pub use crate::optimization::{
        project_bounded_simplex, projected_gradient, DescentConfig, DescentResult, StopReason,
    };
    pub use crate::regression::{ols, OlsFit};
    pub use crate::solvers::{bisection, SolverConfig, SolverResult};
    pub use crate::statistics::{mean, sample_covariance, sample_variance};
}

pub use error::{MathError, MathResult};
