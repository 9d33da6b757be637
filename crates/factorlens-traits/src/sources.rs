//! Data source traits.
//!
//! The engine treats every source as a pure function of its arguments.
//! Caching, retries and rate limiting are the implementation's concern;
//! the engine only bounds concurrency and applies a timeout per call.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::TraitError;
use factorlens_core::types::{AnalysisWindow, FactorProxySet, Frequency, ReturnSeries, RiskLimitSet};

/// Supplies period returns.
#[async_trait]
pub trait ReturnProvider: Send + Sync {
    /// Returns for `ticker` over `window` at `frequency`.
    ///
    /// Fails with [`TraitError::DataUnavailable`] when the ticker or window
    /// cannot be served. Callers may retry; the engine does not.
    async fn get_returns(
        &self,
        ticker: &str,
        window: &AnalysisWindow,
        frequency: Frequency,
    ) -> Result<ReturnSeries, TraitError>;
}

/// Supplies factor proxy sets.
#[async_trait]
pub trait ProxySource: Send + Sync {
    /// Proxy set for `ticker`. An empty set marks a cash-like holding.
    ///
    /// Fails with [`TraitError::ProxyNotConfigured`] for unknown tickers.
    async fn get_factor_proxy_set(&self, ticker: &str) -> Result<FactorProxySet, TraitError>;
}

/// Supplies risk limits.
#[async_trait]
pub trait LimitSource: Send + Sync {
    /// Limit set configured for `scope_id`.
    async fn get_risk_limits(&self, scope_id: &str) -> Result<RiskLimitSet, TraitError>;
}

#[async_trait]
impl<T: ReturnProvider + ?Sized> ReturnProvider for Arc<T> {
    async fn get_returns(
        &self,
        ticker: &str,
        window: &AnalysisWindow,
        frequency: Frequency,
    ) -> Result<ReturnSeries, TraitError> {
        (**self).get_returns(ticker, window, frequency).await
    }
}

#[async_trait]
impl<T: ProxySource + ?Sized> ProxySource for Arc<T> {
    async fn get_factor_proxy_set(&self, ticker: &str) -> Result<FactorProxySet, TraitError> {
        (**self).get_factor_proxy_set(ticker).await
    }
}

#[async_trait]
impl<T: LimitSource + ?Sized> LimitSource for Arc<T> {
    async fn get_risk_limits(&self, scope_id: &str) -> Result<RiskLimitSet, TraitError> {
        (**self).get_risk_limits(scope_id).await
    }
}
