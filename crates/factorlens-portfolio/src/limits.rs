//! Risk limit evaluation.

use factorlens_core::types::{FactorKind, LimitMetric, RiskLimitSet};
use factorlens_core::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

use crate::aggregator::PortfolioRiskSummary;

/// One limit compared against the summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskCheck {
    /// Constrained metric.
    pub metric: LimitMetric,
    /// Value from the summary.
    pub actual: f64,
    /// Configured threshold.
    pub limit: f64,
    /// `actual <= limit`.
    pub pass: bool,
}

impl RiskCheck {
    /// Amount by which the limit is exceeded (0 when passing).
    pub fn excess(&self) -> f64 {
        (self.actual - self.limit).max(0.0)
    }
}

/// Checks in [`LimitMetric::ORDER`], one per configured limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskCheckResult {
    /// Ordered checks.
    pub checks: Vec<RiskCheck>,
}

impl RiskCheckResult {
    /// Returns true if every check passed (vacuously true with no limits).
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.pass)
    }

    /// Failing checks, in order.
    pub fn failures(&self) -> impl Iterator<Item = &RiskCheck> {
        self.checks.iter().filter(|c| !c.pass)
    }

    /// Check for `metric`, if that limit was configured.
    pub fn get(&self, metric: LimitMetric) -> Option<&RiskCheck> {
        self.checks.iter().find(|c| c.metric == metric)
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns true if no limits were configured.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// The summary's value for `metric`.
///
/// The single-factor loss is only available when the covariance carried
/// worst/best factor returns; asking for it otherwise is a configuration
/// error.
pub fn metric_value(summary: &PortfolioRiskSummary, metric: LimitMetric) -> RiskResult<f64> {
    let value = match metric {
        LimitMetric::Volatility => summary.volatility,
        LimitMetric::PositionWeight => summary.max_position_weight,
        LimitMetric::FactorShare => summary.factor_share(),
        LimitMetric::MarketShare => summary.kind_share(FactorKind::Market),
        LimitMetric::IndustryShare => summary.kind_share(FactorKind::Industry),
        LimitMetric::SingleFactorLoss => summary.max_single_factor_loss.ok_or_else(|| {
            RiskError::configuration(format!(
                "{metric} is configured but factor worst-case returns are unavailable"
            ))
        })?,
        LimitMetric::GrossExposure => summary.gross_exposure,
    };
    Ok(value)
}

/// Evaluates every configured limit against `summary`.
///
/// A negative or NaN limit fails the whole evaluation. Equality passes.
pub fn evaluate(summary: &PortfolioRiskSummary, limits: &RiskLimitSet) -> RiskResult<RiskCheckResult> {
    limits.validate()?;
    let checks = limits
        .entries()
        .into_iter()
        .map(|(metric, limit)| {
            let actual = metric_value(summary, metric)?;
            Ok(RiskCheck {
                metric,
                actual,
                limit,
                pass: actual <= limit,
            })
        })
        .collect::<RiskResult<Vec<_>>>()?;
    Ok(RiskCheckResult { checks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorlens_core::types::Frequency;
    use std::collections::BTreeMap;

    fn summary() -> PortfolioRiskSummary {
        let kind_shares = [
            (FactorKind::Market, 0.5),
            (FactorKind::Industry, 0.1),
            (FactorKind::Momentum, 0.05),
        ]
        .into_iter()
        .collect();
        PortfolioRiskSummary {
            volatility: 0.18,
            total_variance: 0.0324,
            factor_variance: 0.0324 * 0.65,
            idiosyncratic_variance: 0.0324 * 0.35,
            factor_contributions: BTreeMap::new(),
            kind_shares,
            positions: Vec::new(),
            herfindahl: 0.3,
            portfolio_betas: BTreeMap::new(),
            factor_losses: BTreeMap::new(),
            max_single_factor_loss: Some(0.07),
            gross_exposure: 1.2,
            net_exposure: 1.0,
            max_position_weight: 0.4,
            frequency: Frequency::Monthly,
        }
    }

    #[test]
    fn test_checks_follow_fixed_order() {
        let limits = RiskLimitSet::new()
            .with_max_gross_exposure(1.5)
            .with_max_market_share(0.4)
            .with_max_volatility(0.2);
        let result = evaluate(&summary(), &limits).unwrap();

        let metrics: Vec<_> = result.checks.iter().map(|c| c.metric).collect();
        assert_eq!(
            metrics,
            vec![
                LimitMetric::Volatility,
                LimitMetric::MarketShare,
                LimitMetric::GrossExposure
            ]
        );
        assert!(!result.all_passed());
        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].metric, LimitMetric::MarketShare);
        assert!((failures[0].excess() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_equality_passes() {
        let limits = RiskLimitSet::new().with_max_position_weight(0.4);
        let result = evaluate(&summary(), &limits).unwrap();
        assert!(result.all_passed());
        assert_eq!(result.checks[0].actual, 0.4);
    }

    #[test]
    fn test_empty_limits() {
        let result = evaluate(&summary(), &RiskLimitSet::new()).unwrap();
        assert!(result.is_empty());
        assert!(result.all_passed());
    }

    #[test]
    fn test_negative_limit_is_fatal() {
        let limits = RiskLimitSet::new().with_max_volatility(-0.1);
        assert!(matches!(
            evaluate(&summary(), &limits),
            Err(RiskError::Configuration { .. })
        ));
    }

    #[test]
    fn test_unavailable_loss_is_fatal() {
        let mut s = summary();
        s.max_single_factor_loss = None;
        let limits = RiskLimitSet::new().with_max_single_factor_loss(0.1);
        assert!(matches!(
            evaluate(&s, &limits),
            Err(RiskError::Configuration { .. })
        ));
    }

    #[test]
    fn test_missing_kind_counts_as_zero() {
        let mut s = summary();
        s.kind_shares.clear();
        let limits = RiskLimitSet::new().with_max_industry_share(0.0);
        assert!(evaluate(&s, &limits).unwrap().all_passed());
    }
}
