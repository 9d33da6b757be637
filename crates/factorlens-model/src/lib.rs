//! # factorlens Model
//!
//! Per-holding factor modelling:
//!
//! - **Resolver**: applies the peer data-quality filter to a proxy set
//! - **Factors**: builds factor return series (excess style factors, peer averages)
//! - **Fit**: OLS regression of a holding on its factors
//! - **Covariance**: factor covariance over the shared window
//!
//! Everything here is synchronous and pure; fetching series is the engine's job.
//!
//! ## Example
//!
//! ```rust,ignore
//! use factorlens_model::prelude::*;
//!
//! let resolver = ProxyResolver::new(&config);
//! let resolved = resolver.resolve("AAPL", &proxies, &target, &series)?;
//! let factors = build_factor_returns(&resolved, &target, &series, &config.factors)?;
//! let model = fit_asset_model(&target, &resolved, &factors, &config.data_quality)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::uninlined_format_args)]

pub mod covariance;
pub mod factors;
pub mod fit;
pub mod resolver;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::covariance::estimate_factor_covariance;
    pub use crate::factors::{build_factor_returns, peer_average, FactorReturns};
    pub use crate::fit::fit_asset_model;
    pub use crate::resolver::{
        DropReason, DroppedPeer, KeptPeer, PeerFilter, PeerSelection, ProxyResolver,
        ResolvedProxySet,
    };
}
