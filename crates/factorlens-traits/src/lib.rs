//! # factorlens Traits
//!
//! Collaborator interfaces for the factorlens risk engine.
//!
//! This crate contains ONLY trait definitions. Implementations live in
//! extension crates (`factorlens-ext-file`) or in the caller.
//!
//! - [`ReturnProvider`]: period returns for a ticker over a window
//! - [`ProxySource`]: factor proxy tickers for a holding
//! - [`LimitSource`]: risk limits for a scope
//!
//! ## Dependency Injection
//!
//! ```ignore
//! RiskEngineBuilder::new()
//!     .with_config(config)
//!     .with_returns(impl ReturnProvider)
//!     .with_proxies(impl ProxySource)
//!     .with_limits(impl LimitSource)
//!     .build()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod sources;

pub use error::TraitError;
pub use sources::{LimitSource, ProxySource, ReturnProvider};
