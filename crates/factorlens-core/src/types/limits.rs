//! Declarative risk limits.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RiskError, RiskResult};

/// A metric a risk limit constrains.
///
/// Variants are declared in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitMetric {
    /// Annualized portfolio volatility.
    Volatility,
    /// Largest absolute single-position weight.
    PositionWeight,
    /// Factor variance as a share of total variance.
    FactorShare,
    /// Market-factor variance as a share of total variance.
    MarketShare,
    /// Industry-factor variance as a share of total variance.
    IndustryShare,
    /// Largest worst-case single-factor loss, as a positive magnitude.
    SingleFactorLoss,
    /// Sum of absolute weights.
    GrossExposure,
}

impl LimitMetric {
    /// All metrics in evaluation order.
    pub const ORDER: [LimitMetric; 7] = [
        LimitMetric::Volatility,
        LimitMetric::PositionWeight,
        LimitMetric::FactorShare,
        LimitMetric::MarketShare,
        LimitMetric::IndustryShare,
        LimitMetric::SingleFactorLoss,
        LimitMetric::GrossExposure,
    ];

    /// Name of the limit field.
    pub fn limit_name(&self) -> &'static str {
        match self {
            LimitMetric::Volatility => "max_volatility",
            LimitMetric::PositionWeight => "max_position_weight",
            LimitMetric::FactorShare => "max_factor_share",
            LimitMetric::MarketShare => "max_market_share",
            LimitMetric::IndustryShare => "max_industry_share",
            LimitMetric::SingleFactorLoss => "max_single_factor_loss",
            LimitMetric::GrossExposure => "max_gross_exposure",
        }
    }
}

impl fmt::Display for LimitMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.limit_name())
    }
}

/// Risk thresholds. Each configured field is one limit entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskLimitSet {
    /// Maximum annualized volatility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_volatility: Option<f64>,
    /// Maximum absolute weight of any single position.
    #[serde(
        default,
        alias = "max_single_stock_weight",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_position_weight: Option<f64>,
    /// Maximum share of variance explained by factors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_factor_share: Option<f64>,
    /// Maximum share of variance from market factors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_market_share: Option<f64>,
    /// Maximum share of variance from industry factors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_industry_share: Option<f64>,
    /// Maximum worst-case loss attributable to one factor (positive magnitude).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_single_factor_loss: Option<f64>,
    /// Maximum gross exposure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gross_exposure: Option<f64>,
}

impl RiskLimitSet {
    /// Creates an empty limit set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the volatility limit.
    #[must_use]
    pub fn with_max_volatility(mut self, limit: f64) -> Self {
        self.max_volatility = Some(limit);
        self
    }

    /// Sets the single-position weight limit.
    #[must_use]
    pub fn with_max_position_weight(mut self, limit: f64) -> Self {
        self.max_position_weight = Some(limit);
        self
    }

    /// Sets the factor variance share limit.
    #[must_use]
    pub fn with_max_factor_share(mut self, limit: f64) -> Self {
        self.max_factor_share = Some(limit);
        self
    }

    /// Sets the market variance share limit.
    #[must_use]
    pub fn with_max_market_share(mut self, limit: f64) -> Self {
        self.max_market_share = Some(limit);
        self
    }

    /// Sets the industry variance share limit.
    #[must_use]
    pub fn with_max_industry_share(mut self, limit: f64) -> Self {
        self.max_industry_share = Some(limit);
        self
    }

    /// Sets the single-factor loss limit.
    #[must_use]
    pub fn with_max_single_factor_loss(mut self, limit: f64) -> Self {
        self.max_single_factor_loss = Some(limit);
        self
    }

    /// Sets the gross exposure limit.
    #[must_use]
    pub fn with_max_gross_exposure(mut self, limit: f64) -> Self {
        self.max_gross_exposure = Some(limit);
        self
    }

    /// Configured limit for `metric`.
    pub fn get(&self, metric: LimitMetric) -> Option<f64> {
        match metric {
            LimitMetric::Volatility => self.max_volatility,
            LimitMetric::PositionWeight => self.max_position_weight,
            LimitMetric::FactorShare => self.max_factor_share,
            LimitMetric::MarketShare => self.max_market_share,
            LimitMetric::IndustryShare => self.max_industry_share,
            LimitMetric::SingleFactorLoss => self.max_single_factor_loss,
            LimitMetric::GrossExposure => self.max_gross_exposure,
        }
    }

    /// Configured entries in evaluation order.
    pub fn entries(&self) -> Vec<(LimitMetric, f64)> {
        LimitMetric::ORDER
            .into_iter()
            .filter_map(|m| self.get(m).map(|limit| (m, limit)))
            .collect()
    }

    /// Returns true if no limit is configured.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Fails on a negative or non-finite limit.
    pub fn validate(&self) -> RiskResult<()> {
        for (metric, limit) in self.entries() {
            if !limit.is_finite() || limit < 0.0 {
                return Err(RiskError::configuration(format!(
                    "{metric} must be a non-negative number, got {limit}"
                )));
            }
        }
        Ok(())
    }
}
