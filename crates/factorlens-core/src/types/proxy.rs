//! Factor proxy configuration per ticker.

use serde::{Deserialize, Serialize};

use super::{FactorId, FactorKind};
use crate::error::{RiskError, RiskResult};

/// Proxy tickers used to measure each factor for one holding.
///
/// A set with nothing configured marks a cash-like holding. Otherwise all
/// four named proxies must be present; `peers` may be empty, in which case
/// the holding has no sub-industry factor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactorProxySet {
    /// Market proxy ticker.
    #[serde(default)]
    pub market: Option<String>,
    /// Momentum proxy ticker.
    #[serde(default)]
    pub momentum: Option<String>,
    /// Value proxy ticker.
    #[serde(default)]
    pub value: Option<String>,
    /// Industry proxy ticker.
    #[serde(default)]
    pub industry: Option<String>,
    /// Peer tickers for the sub-industry factor, in caller order.
    #[serde(default)]
    pub peers: Vec<String>,
}

impl FactorProxySet {
    /// Creates a complete proxy set.
    pub fn new(
        market: impl Into<String>,
        momentum: impl Into<String>,
        value: impl Into<String>,
        industry: impl Into<String>,
        peers: Vec<String>,
    ) -> Self {
        Self {
            market: Some(market.into()),
            momentum: Some(momentum.into()),
            value: Some(value.into()),
            industry: Some(industry.into()),
            peers,
        }
    }

    /// The empty (cash) proxy set.
    pub fn cash() -> Self {
        Self::default()
    }

    /// Returns true if nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.market.is_none()
            && self.momentum.is_none()
            && self.value.is_none()
            && self.industry.is_none()
            && self.peers.is_empty()
    }

    /// Names of the missing named proxies.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("market", &self.market),
            ("momentum", &self.momentum),
            ("value", &self.value),
            ("industry", &self.industry),
        ]
        .into_iter()
        .filter(|(_, proxy)| proxy.as_deref().map_or(true, |t| t.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    /// Returns true if all four named proxies are present.
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// The four named factors with their proxy tickers, in kind order.
    ///
    /// Fails with `ProxyNotConfigured` naming the missing proxies.
    pub fn named_factors(&self, ticker: &str) -> RiskResult<Vec<(FactorId, String)>> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(RiskError::proxy_not_configured(
                ticker,
                format!("missing {} proxy", missing.join(", ")),
            ));
        }
        let pairs = [
            (FactorKind::Market, &self.market),
            (FactorKind::Momentum, &self.momentum),
            (FactorKind::Value, &self.value),
            (FactorKind::Industry, &self.industry),
        ];
        Ok(pairs
            .into_iter()
            .filter_map(|(kind, proxy)| {
                proxy
                    .as_ref()
                    .map(|t| (FactorId::new(kind, t.clone()), t.clone()))
            })
            .collect())
    }
}
