//! Builder for the risk engine.

use std::sync::Arc;

use factorlens_core::config::EngineConfig;
use factorlens_core::{RiskError, RiskResult};
use factorlens_traits::{LimitSource, ProxySource, ReturnProvider};

use crate::engine::RiskEngine;

/// Builder for constructing a [`RiskEngine`].
///
/// The configuration, return provider and proxy source are required. There
/// is no default configuration: `build` fails unless one was supplied.
#[derive(Default)]
pub struct RiskEngineBuilder {
    config: Option<EngineConfig>,
    returns: Option<Arc<dyn ReturnProvider>>,
    proxies: Option<Arc<dyn ProxySource>>,
    limits: Option<Arc<dyn LimitSource>>,
}

impl RiskEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the return provider.
    #[must_use]
    pub fn with_returns(mut self, provider: impl ReturnProvider + 'static) -> Self {
        self.returns = Some(Arc::new(provider));
        self
    }

    /// Set the proxy source.
    #[must_use]
    pub fn with_proxies(mut self, source: impl ProxySource + 'static) -> Self {
        self.proxies = Some(Arc::new(source));
        self
    }

    /// Set the limit source used by scope lookups.
    #[must_use]
    pub fn with_limits(mut self, source: impl LimitSource + 'static) -> Self {
        self.limits = Some(Arc::new(source));
        self
    }

    /// Build the engine.
    pub fn build(self) -> RiskResult<RiskEngine> {
        let config = self
            .config
            .ok_or_else(|| RiskError::configuration("engine config not provided"))?;
        config.validate()?;

        let returns = self
            .returns
            .ok_or_else(|| RiskError::configuration("return provider not configured"))?;
        let proxies = self
            .proxies
            .ok_or_else(|| RiskError::configuration("proxy source not configured"))?;

        Ok(RiskEngine::new(config, returns, proxies, self.limits))
    }
}
