//! Per-holding fitting with bounded concurrency.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use factorlens_core::config::EngineConfig;
use factorlens_core::types::{
    AnalysisWindow, AssetFactorModel, FactorCovariance, FactorProxySet, Frequency, Holding,
    ReturnSeries,
};
use factorlens_core::{RiskError, RiskResult};
use factorlens_model::prelude::{
    build_factor_returns, estimate_factor_covariance, fit_asset_model, DroppedPeer, FactorReturns,
    ProxyResolver,
};
use factorlens_traits::{ProxySource, ReturnProvider, TraitError};

use crate::cache::ReturnCache;
use crate::error::{provider_error, timed_out};

/// Factor models for a portfolio and the covariance of their factors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedPortfolio {
    /// One model per holding, in holding order.
    pub models: Vec<AssetFactorModel>,
    /// Covariance over every factor any model loads on.
    pub covariance: FactorCovariance,
    /// Peers removed by the data-quality filter, per holding.
    pub dropped_peers: BTreeMap<String, Vec<DroppedPeer>>,
}

struct AssetFit {
    model: AssetFactorModel,
    factors: Vec<FactorReturns>,
    dropped_peers: Vec<DroppedPeer>,
}

/// Shared state for one run. Lives only as long as the run.
pub(crate) struct FitContext {
    config: EngineConfig,
    resolver: ProxyResolver,
    returns: Arc<dyn ReturnProvider>,
    proxies: Arc<dyn ProxySource>,
    cache: ReturnCache,
    window: AnalysisWindow,
}

impl FitContext {
    pub(crate) fn new(
        config: &EngineConfig,
        returns: Arc<dyn ReturnProvider>,
        proxies: Arc<dyn ProxySource>,
        window: AnalysisWindow,
    ) -> Self {
        Self {
            config: config.clone(),
            resolver: ProxyResolver::new(config),
            returns,
            proxies,
            cache: ReturnCache::new(),
            window,
        }
    }

    fn frequency(&self) -> Frequency {
        self.config.factors.frequency
    }

    fn timeout(&self) -> Duration {
        self.config.concurrency.provider_timeout()
    }

    async fn timed<T, F>(&self, ticker: &str, call: F) -> RiskResult<T>
    where
        F: Future<Output = Result<T, TraitError>>,
    {
        match tokio::time::timeout(self.timeout(), call).await {
            Ok(result) => result.map_err(|e| provider_error(ticker, e)),
            Err(_) => Err(timed_out(ticker, self.timeout())),
        }
    }

    async fn proxy_set(&self, ticker: &str) -> RiskResult<FactorProxySet> {
        self.timed(ticker, self.proxies.get_factor_proxy_set(ticker))
            .await
    }

    async fn series(&self, ticker: &str) -> RiskResult<ReturnSeries> {
        let frequency = self.frequency();
        self.cache
            .get_or_fetch(ticker, &self.window, frequency, || async {
                let series = self
                    .timed(ticker, self.returns.get_returns(ticker, &self.window, frequency))
                    .await?;
                Ok(series.restrict(&self.window))
            })
            .await
    }

    async fn fit(&self, ticker: &str) -> RiskResult<AssetFit> {
        let proxies = if self.config.factors.is_cash_ticker(ticker) {
            FactorProxySet::cash()
        } else {
            self.proxy_set(ticker).await?
        };
        if self.resolver.is_cash(ticker, &proxies)? {
            debug!(ticker, "cash holding; factor model skipped");
            return Ok(AssetFit {
                model: AssetFactorModel::cash(ticker, self.frequency()),
                factors: Vec::new(),
                dropped_peers: Vec::new(),
            });
        }

        let target = self.series(ticker).await?;
        let mut series = BTreeMap::new();
        for (_, proxy) in proxies.named_factors(ticker)? {
            if !series.contains_key(&proxy) {
                let fetched = self.series(&proxy).await?;
                series.insert(proxy, fetched);
            }
        }
        for peer in &proxies.peers {
            if series.contains_key(peer) || peer.eq_ignore_ascii_case(ticker) {
                continue;
            }
            match self.series(peer).await {
                Ok(fetched) => {
                    series.insert(peer.clone(), fetched);
                }
                // The peer filter records it as unavailable.
                Err(e) if e.is_retryable() => debug!(ticker, peer = %peer, error = %e, "peer unavailable"),
                Err(e) => return Err(e),
            }
        }

        let resolved = self.resolver.resolve(ticker, &proxies, &target, &series)?;
        let factors = build_factor_returns(&resolved, &target, &series, &self.config.factors)?;
        let model = fit_asset_model(&target, &resolved, &factors, &self.config.data_quality)?;
        Ok(AssetFit {
            model,
            factors,
            dropped_peers: resolved.dropped_peers().to_vec(),
        })
    }
}

/// Fits every holding, at most `max_concurrent_assets` at a time.
///
/// The first failure aborts the remaining tasks and is returned.
pub(crate) async fn fit_portfolio(
    context: Arc<FitContext>,
    holdings: &[Holding],
) -> RiskResult<FittedPortfolio> {
    let permits = context.config.concurrency.max_concurrent_assets.max(1);
    let semaphore = Arc::new(Semaphore::new(permits));
    let mut tasks = JoinSet::new();

    for (index, holding) in holdings.iter().enumerate() {
        let context = Arc::clone(&context);
        let semaphore = Arc::clone(&semaphore);
        let ticker = holding.ticker.clone();
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| RiskError::configuration("fitting semaphore closed"))?;
            context.fit(&ticker).await.map(|fit| (index, fit))
        });
    }

    let mut fits: Vec<Option<AssetFit>> = holdings.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok((index, fit))) => fits[index] = Some(fit),
            Ok(Err(error)) => {
                tasks.abort_all();
                warn!(%error, "fitting failed; remaining holdings aborted");
                return Err(error);
            }
            Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
            Err(error) => {
                return Err(RiskError::configuration(format!(
                    "fitting task stopped: {error}"
                )))
            }
        }
    }

    let mut models = Vec::with_capacity(holdings.len());
    let mut factors = Vec::new();
    let mut dropped_peers = BTreeMap::new();
    for fit in fits.into_iter().flatten() {
        if !fit.dropped_peers.is_empty() {
            dropped_peers.insert(fit.model.ticker.clone(), fit.dropped_peers);
        }
        factors.extend(fit.factors);
        models.push(fit.model);
    }

    let covariance = estimate_factor_covariance(
        &factors,
        context.frequency(),
        context.config.data_quality.min_observations,
    )?;
    debug!(
        holdings = models.len(),
        factors = covariance.dimension(),
        cached_series = context.cache.len(),
        "portfolio fitted"
    );

    Ok(FittedPortfolio {
        models,
        covariance,
        dropped_peers,
    })
}
