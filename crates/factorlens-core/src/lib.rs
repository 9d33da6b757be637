//! # factorlens Core
//!
//! Core types, errors and configuration shared by every factorlens crate.
//!
//! - **Types**: `Holding`, `ReturnSeries`, `FactorProxySet`, `FactorId`,
//!   `AssetFactorModel`, `FactorCovariance`, `RiskLimitSet`
//! - **Errors**: the `RiskError` taxonomy
//! - **Configuration**: the explicit `EngineConfig` threaded through every entry point
//!
//! ## Example
//!
//! ```rust
//! use factorlens_core::prelude::*;
//!
//! let holding = Holding::new("AAPL", 0.6);
//! let limits = RiskLimitSet::new().with_max_position_weight(0.40);
//! assert_eq!(limits.entries().len(), 1);
//! assert_eq!(holding.weight, 0.6);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod error;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{
        AggregationConfig, ConcurrencyConfig, DataQualityConfig, EngineConfig, FactorConfig,
        OptimizerConfig,
    };
    pub use crate::error::{RiskError, RiskResult};
    pub use crate::types::{
        inner_join, validate_holdings, AlignedReturns, AnalysisWindow, AssetFactorModel,
        FactorCovariance, FactorId, FactorKind, FactorProxySet, FitDiagnostics, Frequency,
        Holding, LimitMetric, ReturnPoint, ReturnSeries, RiskLimitSet,
    };
}

pub use error::{RiskError, RiskResult};
