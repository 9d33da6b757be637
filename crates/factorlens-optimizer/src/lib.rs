//! # factorlens Optimizer
//!
//! Re-solves portfolio weights under the same factor risk model the
//! aggregator uses.
//!
//! Two objectives are supported: minimum variance and maximum expected
//! return. Risk limits are hard constraints for both. The single-position
//! limit tightens the weight box; every other limit enters an augmented
//! Lagrangian. Each round minimizes the penalized objective with accelerated
//! projected gradient descent, then updates the multipliers and grows the
//! penalty when the violation did not shrink enough. The problem is declared
//! infeasible once the penalty reaches its cap, or the violation stops
//! shrinking for several rounds, with limits still exceeded.
//!
//! A run moves through `Initialized → Solving → {Converged, Infeasible,
//! MaxIterationsExceeded, Cancelled}`. Terminal states are values in the
//! [`OptimizationResult`], not errors; [`OptimizationResult::into_result`]
//! converts them for callers that prefer `?`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use factorlens_optimizer::prelude::*;
//!
//! let optimizer = Optimizer::new(config.optimizer.clone());
//! let result = optimizer.optimize(
//!     &Objective::MinVariance,
//!     &holdings,
//!     &models,
//!     &covariance,
//!     &limits,
//!     &WeightBounds::long_only(),
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod bounds;
pub mod cancel;
pub mod objective;
pub mod optimizer;
mod penalty;
pub mod result;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bounds::{TickerBounds, WeightBounds, WeightScaling};
    pub use crate::cancel::CancellationFlag;
    pub use crate::objective::Objective;
    pub use crate::optimizer::Optimizer;
    pub use crate::result::{OptimizationDiagnostics, OptimizationResult, OptimizationStatus};
}

pub use bounds::{WeightBounds, WeightScaling};
pub use cancel::CancellationFlag;
pub use objective::Objective;
pub use optimizer::Optimizer;
pub use result::{OptimizationResult, OptimizationStatus};
