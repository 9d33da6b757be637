//! # factorlens Portfolio
//!
//! Portfolio-level factor risk.
//!
//! The [`Aggregator`] is the single source of portfolio risk numbers: it
//! combines holdings, per-asset factor models and the factor covariance into
//! a [`PortfolioRiskSummary`]. The optimizer evaluates variance through the
//! same [`FactorRiskModel`] and re-aggregates its final weights here.
//!
//! ## Design Philosophy
//!
//! - **Pure functions**: All calculations are stateless with explicit inputs
//! - **Raw weights**: Nothing here normalizes weights
//! - **Deterministic**: Ordered maps and ordered reductions, so identical
//!   inputs give bit-identical output
//! - **Config-driven parallelism**: Optional rayon support with threshold-based switching
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use factorlens_portfolio::prelude::*;
//!
//! let summary = aggregate(&holdings, &models, &covariance)?;
//! let checks = evaluate(&summary, &limits)?;
//! println!("{}", summary.to_report());
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: Enable rayon-based parallel processing for large portfolios

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregator;
pub mod limits;
pub mod parallel;
pub mod report;
pub mod risk_model;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::aggregator::{aggregate, Aggregator, PortfolioRiskSummary, PositionRisk};
    pub use crate::limits::{evaluate, metric_value, RiskCheck, RiskCheckResult};
    pub use crate::risk_model::FactorRiskModel;
}

pub use aggregator::{aggregate, Aggregator, PortfolioRiskSummary};
pub use limits::{evaluate, RiskCheck, RiskCheckResult};
pub use risk_model::FactorRiskModel;
