//! The risk engine entry points.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use factorlens_core::config::EngineConfig;
use factorlens_core::types::{validate_holdings, AnalysisWindow, Holding, RiskLimitSet};
use factorlens_core::{RiskError, RiskResult};
use factorlens_optimizer::prelude::{
    CancellationFlag, Objective, OptimizationResult, Optimizer, WeightBounds, WeightScaling,
};
use factorlens_portfolio::prelude::{
    evaluate, Aggregator, PortfolioRiskSummary, RiskCheckResult,
};
use factorlens_traits::{LimitSource, ProxySource, ReturnProvider};

use crate::error::limit_error;
use crate::fitting::{fit_portfolio, FitContext, FittedPortfolio};

/// Everything one analysis run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAnalysis {
    /// Window the models were fitted over.
    pub window: AnalysisWindow,
    /// Fitted models and factor covariance.
    pub fitted: FittedPortfolio,
    /// Portfolio risk at the input weights.
    pub summary: PortfolioRiskSummary,
    /// Limit checks against `summary`.
    pub checks: RiskCheckResult,
}

impl RiskAnalysis {
    /// JSON projection of the summary and checks.
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "window": {
                "start": self.window.start().to_string(),
                "end": self.window.end().to_string(),
            },
            "summary": self.summary.to_wire(),
            "checks": self.checks.to_wire(),
        })
    }
}

/// Inputs for [`RiskEngine::optimize`].
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    /// What to optimize.
    pub objective: Objective,
    /// Current holdings; their tickers are the optimization universe.
    pub holdings: Vec<Holding>,
    /// Window the models are fitted over.
    pub window: AnalysisWindow,
    /// Limits enforced as constraints.
    pub limits: RiskLimitSet,
    /// Box constraints on normalized weights.
    pub bounds: WeightBounds,
    /// How solved weights are reported.
    pub scaling: WeightScaling,
    /// Cooperative cancellation.
    pub cancellation: CancellationFlag,
}

impl OptimizationRequest {
    /// Long-only request with no limits.
    pub fn new(objective: Objective, holdings: Vec<Holding>, window: AnalysisWindow) -> Self {
        Self {
            objective,
            holdings,
            window,
            limits: RiskLimitSet::new(),
            bounds: WeightBounds::long_only(),
            scaling: WeightScaling::Normalized,
            cancellation: CancellationFlag::new(),
        }
    }

    /// Sets the limits.
    #[must_use]
    pub fn with_limits(mut self, limits: RiskLimitSet) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the weight bounds.
    #[must_use]
    pub fn with_bounds(mut self, bounds: WeightBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Sets the output scaling.
    #[must_use]
    pub fn with_scaling(mut self, scaling: WeightScaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Uses `flag` for cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }
}

/// Fits factor models for a portfolio and evaluates or optimizes its risk.
///
/// Built with [`RiskEngineBuilder`](crate::RiskEngineBuilder). Each call is
/// an independent run: provider results are shared within the run and
/// dropped when it ends.
#[derive(Clone)]
pub struct RiskEngine {
    config: EngineConfig,
    returns: Arc<dyn ReturnProvider>,
    proxies: Arc<dyn ProxySource>,
    limits: Option<Arc<dyn LimitSource>>,
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine")
            .field("config", &self.config)
            .field("has_limit_source", &self.limits.is_some())
            .finish_non_exhaustive()
    }
}

impl RiskEngine {
    pub(crate) fn new(
        config: EngineConfig,
        returns: Arc<dyn ReturnProvider>,
        proxies: Arc<dyn ProxySource>,
        limits: Option<Arc<dyn LimitSource>>,
    ) -> Self {
        Self {
            config,
            returns,
            proxies,
            limits,
        }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Limits configured for `scope` in the limit source.
    pub async fn limits(&self, scope: &str) -> RiskResult<RiskLimitSet> {
        let source = self.limits.as_ref().ok_or_else(|| {
            RiskError::configuration(format!("no limit source to look up scope {scope}"))
        })?;
        let timeout = self.config.concurrency.provider_timeout();
        let limits = match tokio::time::timeout(timeout, source.get_risk_limits(scope)).await {
            Ok(result) => result.map_err(|e| limit_error(scope, e))?,
            Err(_) => return Err(crate::error::timed_out(scope, timeout)),
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Fits a factor model per holding and the factor covariance.
    pub async fn fit(
        &self,
        holdings: &[Holding],
        window: &AnalysisWindow,
    ) -> RiskResult<FittedPortfolio> {
        validate_holdings(holdings)?;
        let context = Arc::new(FitContext::new(
            &self.config,
            Arc::clone(&self.returns),
            Arc::clone(&self.proxies),
            *window,
        ));
        fit_portfolio(context, holdings).await
    }

    /// Fits, aggregates and checks `holdings` against `limits`.
    pub async fn analyze(
        &self,
        holdings: &[Holding],
        window: &AnalysisWindow,
        limits: &RiskLimitSet,
    ) -> RiskResult<RiskAnalysis> {
        limits.validate()?;
        info!(holdings = holdings.len(), %window, "analysis started");

        let fitted = self.fit(holdings, window).await?;
        let summary = Aggregator::new(self.config.aggregation.clone()).aggregate(
            holdings,
            &fitted.models,
            &fitted.covariance,
        )?;
        let checks = evaluate(&summary, limits)?;

        if checks.all_passed() {
            info!(volatility = summary.volatility, "analysis finished");
        } else {
            let failed: Vec<&str> = checks.failures().map(|c| c.metric.limit_name()).collect();
            warn!(volatility = summary.volatility, ?failed, "analysis finished with limit breaches");
        }

        Ok(RiskAnalysis {
            window: *window,
            fitted,
            summary,
            checks,
        })
    }

    /// Looks up the limits for `scope`, then runs [`analyze`](Self::analyze).
    pub async fn analyze_scope(
        &self,
        holdings: &[Holding],
        window: &AnalysisWindow,
        scope: &str,
    ) -> RiskResult<RiskAnalysis> {
        let limits = self.limits(scope).await?;
        self.analyze(holdings, window, &limits).await
    }

    /// Fits the portfolio, then solves weights on a blocking thread.
    pub async fn optimize(&self, request: OptimizationRequest) -> RiskResult<OptimizationResult> {
        let fitted = self.fit(&request.holdings, &request.window).await?;
        let optimizer = Optimizer::new(self.config.optimizer.clone())
            .with_scaling(request.scaling)
            .with_cancellation(request.cancellation.clone());

        let solve = tokio::task::spawn_blocking(move || {
            optimizer.optimize(
                &request.objective,
                &request.holdings,
                &fitted.models,
                &fitted.covariance,
                &request.limits,
                &request.bounds,
            )
        });
        match solve.await {
            Ok(result) => result,
            Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
            Err(error) => Err(RiskError::configuration(format!(
                "optimization task stopped: {error}"
            ))),
        }
    }
}
