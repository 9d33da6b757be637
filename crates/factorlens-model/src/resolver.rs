//! Factor proxy resolution and the peer data-quality filter.
//!
//! A regression window silently shrinks to the shortest regressor, so a
//! peer with less history than the target would truncate every factor's
//! window, not just its own. Every peer must therefore observe at least as
//! many of the target's periods as the target itself; peers that do not are
//! dropped, never substituted.

use std::collections::{BTreeMap, BTreeSet};

use factorlens_core::config::{DataQualityConfig, EngineConfig, FactorConfig};
use factorlens_core::types::{FactorProxySet, ReturnSeries};
use factorlens_core::{RiskError, RiskResult};
use serde::Serialize;

/// Why a peer was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Fewer overlapping observations than the target.
    InsufficientHistory,
    /// The provider could not serve the peer.
    Unavailable,
    /// The peer is the target itself.
    SameAsTarget,
    /// The peer was listed more than once.
    Duplicate,
    /// Beyond the configured peer cap.
    OverCap,
}

/// A peer excluded by the filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedPeer {
    /// Peer ticker.
    pub ticker: String,
    /// Observations on the target's periods.
    pub observations: usize,
    /// Observations required (the target's count).
    pub required: usize,
    /// Why it was dropped.
    pub reason: DropReason,
}

/// A peer that passed the filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeptPeer {
    /// Peer ticker.
    pub ticker: String,
    /// Observations on the target's periods.
    pub observations: usize,
}

/// Outcome of filtering a peer list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSelection {
    /// Peers kept, in caller order.
    pub kept: Vec<KeptPeer>,
    /// Peers dropped, in caller order.
    pub dropped: Vec<DroppedPeer>,
}

/// Pure peer filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerFilter {
    max_peers: Option<usize>,
}

impl PeerFilter {
    /// Creates a filter from the data-quality settings.
    pub fn new(config: &DataQualityConfig) -> Self {
        Self {
            max_peers: config.max_peers,
        }
    }

    /// Filters `peers` against `target`.
    ///
    /// `series` holds whatever peer series the provider could serve; a peer
    /// with no entry counts as zero observations.
    pub fn filter(
        &self,
        target: &ReturnSeries,
        peers: &[String],
        series: &BTreeMap<String, ReturnSeries>,
    ) -> PeerSelection {
        let required = target.len();
        let mut selection = PeerSelection::default();
        let mut seen = BTreeSet::new();

        for peer in peers {
            let dropped = |observations, reason| DroppedPeer {
                ticker: peer.clone(),
                observations,
                required,
                reason,
            };

            if peer.eq_ignore_ascii_case(target.ticker()) {
                selection.dropped.push(dropped(required, DropReason::SameAsTarget));
                continue;
            }
            if !seen.insert(peer.as_str()) {
                selection.dropped.push(dropped(0, DropReason::Duplicate));
                continue;
            }
            let Some(peer_series) = series.get(peer) else {
                selection.dropped.push(dropped(0, DropReason::Unavailable));
                continue;
            };

            let observations = target.overlap_count(peer_series);
            if observations < required {
                selection
                    .dropped
                    .push(dropped(observations, DropReason::InsufficientHistory));
            } else if self.max_peers.is_some_and(|cap| selection.kept.len() >= cap) {
                selection.dropped.push(dropped(observations, DropReason::OverCap));
            } else {
                selection.kept.push(KeptPeer {
                    ticker: peer.clone(),
                    observations,
                });
            }
        }

        selection
    }
}

/// A proxy set that has passed resolution.
///
/// Only [`ProxyResolver::resolve`] produces one, so holding a
/// `ResolvedProxySet` means the peer filter has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProxySet {
    ticker: String,
    proxies: FactorProxySet,
    kept_peers: Vec<KeptPeer>,
    dropped_peers: Vec<DroppedPeer>,
    target_observations: usize,
}

impl ResolvedProxySet {
    /// Holding ticker.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// The proxy set with only the kept peers.
    pub fn proxies(&self) -> &FactorProxySet {
        &self.proxies
    }

    /// Peers kept, in caller order.
    pub fn kept_peers(&self) -> &[KeptPeer] {
        &self.kept_peers
    }

    /// Peers dropped by the filter.
    pub fn dropped_peers(&self) -> &[DroppedPeer] {
        &self.dropped_peers
    }

    /// Target observations in the window.
    pub fn target_observations(&self) -> usize {
        self.target_observations
    }

    /// Returns true if a sub-industry factor will be built.
    pub fn has_sub_industry(&self) -> bool {
        !self.kept_peers.is_empty()
    }
}

/// Maps holdings to validated factor proxy sets.
#[derive(Debug, Clone)]
pub struct ProxyResolver {
    data_quality: DataQualityConfig,
    factors: FactorConfig,
    filter: PeerFilter,
}

impl ProxyResolver {
    /// Creates a resolver from the engine config.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            data_quality: config.data_quality.clone(),
            factors: config.factors.clone(),
            filter: PeerFilter::new(&config.data_quality),
        }
    }

    /// Returns true if `ticker` bypasses factor modelling.
    ///
    /// Cash is an empty proxy set or a configured cash ticker. A partially
    /// configured set is `ProxyNotConfigured`.
    pub fn is_cash(&self, ticker: &str, proxies: &FactorProxySet) -> RiskResult<bool> {
        if self.factors.is_cash_ticker(ticker) || proxies.is_empty() {
            return Ok(true);
        }
        proxies.named_factors(ticker)?;
        Ok(false)
    }

    /// Resolves `proxies` for `ticker` against the fetched `target` series.
    ///
    /// Fails with `DataQuality` if the target has fewer observations than
    /// the configured floor, and with `ProxyNotConfigured` if a named proxy
    /// is missing. Peers are filtered by [`PeerFilter`].
    pub fn resolve(
        &self,
        ticker: &str,
        proxies: &FactorProxySet,
        target: &ReturnSeries,
        series: &BTreeMap<String, ReturnSeries>,
    ) -> RiskResult<ResolvedProxySet> {
        proxies.named_factors(ticker)?;

        let min = self.data_quality.min_observations;
        if target.len() < min {
            return Err(RiskError::data_quality(
                ticker,
                format!("{} observations, need at least {min}", target.len()),
            ));
        }

        let selection = self.filter.filter(target, &proxies.peers, series);
        for dropped in &selection.dropped {
            tracing::warn!(
                target_ticker = ticker,
                peer = %dropped.ticker,
                observations = dropped.observations,
                required = dropped.required,
                reason = ?dropped.reason,
                "dropped peer"
            );
        }

        let mut resolved = proxies.clone();
        resolved.peers = selection.kept.iter().map(|p| p.ticker.clone()).collect();

        Ok(ResolvedProxySet {
            ticker: ticker.to_string(),
            proxies: resolved,
            kept_peers: selection.kept,
            dropped_peers: selection.dropped,
            target_observations: target.len(),
        })
    }
}
