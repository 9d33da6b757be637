//! Factor return construction.

use std::collections::BTreeMap;

use factorlens_core::config::FactorConfig;
use factorlens_core::types::{FactorId, FactorKind, ReturnPoint, ReturnSeries};
use factorlens_core::{RiskError, RiskResult};

use crate::resolver::ResolvedProxySet;

/// A factor together with its return series.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorReturns {
    /// The factor.
    pub factor: FactorId,
    /// Its period returns.
    pub series: ReturnSeries,
}

fn lookup<'a>(
    series: &'a BTreeMap<String, ReturnSeries>,
    ticker: &str,
) -> RiskResult<&'a ReturnSeries> {
    series
        .get(ticker)
        .ok_or_else(|| RiskError::data_unavailable(ticker, "series not supplied"))
}

/// Builds the factor return series for a resolved holding, in factor order.
///
/// Market and industry factors are the proxy returns. Momentum and value are
/// measured in excess of the market proxy when `excess_style_factors` is set,
/// and are then labelled `<proxy>-<market>` (`momentum:MTUM-SPY`).
/// The sub-industry factor is the equal-weighted average of the kept peers
/// on the target's periods, and is absent when no peer survived filtering.
pub fn build_factor_returns(
    resolved: &ResolvedProxySet,
    target: &ReturnSeries,
    series: &BTreeMap<String, ReturnSeries>,
    config: &FactorConfig,
) -> RiskResult<Vec<FactorReturns>> {
    let named = resolved.proxies().named_factors(resolved.ticker())?;
    let market_ticker = resolved
        .proxies()
        .market
        .as_deref()
        .ok_or_else(|| RiskError::proxy_not_configured(resolved.ticker(), "missing market proxy"))?;
    let market = lookup(series, market_ticker)?;

    let mut factors = Vec::with_capacity(named.len() + 1);
    for (factor, proxy) in named {
        let raw = lookup(series, &proxy)?;
        let (factor, returns) = match factor.kind() {
            FactorKind::Momentum | FactorKind::Value if config.excess_style_factors => {
                // Keyed by both tickers: holdings on different market proxies
                // produce different series for the same style proxy.
                let label = format!("{proxy}-{market_ticker}");
                (
                    FactorId::new(factor.kind(), label.as_str()),
                    raw.excess_over(market, label),
                )
            }
            _ => (factor, raw.clone()),
        };
        factors.push(FactorReturns {
            factor,
            series: returns,
        });
    }

    if resolved.has_sub_industry() {
        let peers = resolved
            .kept_peers()
            .iter()
            .map(|p| lookup(series, &p.ticker))
            .collect::<RiskResult<Vec<_>>>()?;
        factors.push(FactorReturns {
            factor: FactorId::sub_industry(resolved.ticker()),
            series: peer_average(resolved.ticker(), target, &peers)?,
        });
    }

    Ok(factors)
}

/// Equal-weighted average of `peers` on the periods of `target` that every
/// peer observes.
pub fn peer_average(
    label: &str,
    target: &ReturnSeries,
    peers: &[&ReturnSeries],
) -> RiskResult<ReturnSeries> {
    if peers.is_empty() {
        return Err(RiskError::data_quality(label, "peer average of no peers"));
    }
    let count = peers.len() as f64;
    let points = target
        .dates()
        .filter_map(|date| {
            let values: Option<Vec<f64>> = peers.iter().map(|p| p.value_on(date)).collect();
            values.map(|v| ReturnPoint::new(date, v.iter().sum::<f64>() / count))
        })
        .collect();
    ReturnSeries::new(format!("peers:{label}"), target.frequency(), points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ProxyResolver;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use factorlens_core::config::EngineConfig;
    use factorlens_core::types::{FactorProxySet, Frequency};

    fn month(i: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019 + (i / 12) as i32, i % 12 + 1, 1).unwrap()
    }

    fn constant(ticker: &str, n: u32, value: f64) -> ReturnSeries {
        ReturnSeries::from_pairs(ticker, Frequency::Monthly, (0..n).map(|m| (month(m), value)))
            .unwrap()
    }

    fn setup(excess: bool) -> (Vec<FactorReturns>, ReturnSeries) {
        let config = EngineConfig::default().with_excess_style_factors(excess);
        let target = constant("AAPL", 24, 0.01);
        let series: BTreeMap<String, ReturnSeries> = [
            constant("SPY", 24, 0.02),
            constant("MTUM", 24, 0.05),
            constant("VLUE", 24, 0.01),
            constant("XLK", 24, 0.03),
            constant("MSFT", 24, 0.04),
            constant("GOOGL", 30, 0.06),
        ]
        .into_iter()
        .map(|s| (s.ticker().to_string(), s))
        .collect();
        let proxies = FactorProxySet::new(
            "SPY",
            "MTUM",
            "VLUE",
            "XLK",
            vec!["MSFT".into(), "GOOGL".into()],
        );
        let resolved = ProxyResolver::new(&config)
            .resolve("AAPL", &proxies, &target, &series)
            .unwrap();
        let factors = build_factor_returns(&resolved, &target, &series, &config.factors).unwrap();
        (factors, target)
    }

    #[test]
    fn test_excess_style_factors() {
        let (factors, _) = setup(true);
        assert_eq!(factors.len(), 5);
        assert_eq!(factors[1].factor, FactorId::momentum("MTUM-SPY"));
        assert_eq!(factors[2].factor, FactorId::value("VLUE-SPY"));
        assert_relative_eq!(factors[1].series.points()[0].value, 0.03, epsilon = 1e-15);
        assert_relative_eq!(factors[2].series.points()[0].value, -0.01, epsilon = 1e-15);
        // industry stays raw
        assert_relative_eq!(factors[3].series.points()[0].value, 0.03);
    }

    #[test]
    fn test_raw_style_factors() {
        let (factors, _) = setup(false);
        assert_eq!(factors[1].factor, FactorId::momentum("MTUM"));
        assert_relative_eq!(factors[1].series.points()[0].value, 0.05);
    }

    #[test]
    fn test_style_factor_ids_follow_market_proxy() {
        let config = EngineConfig::default();
        let series: BTreeMap<String, ReturnSeries> = [
            constant("SPY", 24, 0.02),
            constant("EFA", 24, 0.01),
            constant("MTUM", 24, 0.05),
            constant("VLUE", 24, 0.01),
            constant("XLK", 24, 0.03),
        ]
        .into_iter()
        .map(|s| (s.ticker().to_string(), s))
        .collect();
        let resolver = ProxyResolver::new(&config);
        let build = |ticker: &str, market: &str| {
            let target = constant(ticker, 24, 0.01);
            let proxies = FactorProxySet::new(market, "MTUM", "VLUE", "XLK", Vec::new());
            let resolved = resolver.resolve(ticker, &proxies, &target, &series).unwrap();
            build_factor_returns(&resolved, &target, &series, &config.factors).unwrap()
        };

        let us = build("AAPL", "SPY");
        let intl = build("SAP", "EFA");
        assert_ne!(us[1].factor, intl[1].factor);
        assert_eq!(intl[1].factor, FactorId::momentum("MTUM-EFA"));
        assert_relative_eq!(us[1].series.points()[0].value, 0.03, epsilon = 1e-15);
        assert_relative_eq!(intl[1].series.points()[0].value, 0.04, epsilon = 1e-15);
        // shared raw proxies keep one id
        assert_eq!(us[3].factor, intl[3].factor);

        let all: Vec<FactorReturns> = us.iter().chain(&intl).cloned().collect();
        let cov = crate::covariance::estimate_factor_covariance(&all, Frequency::Monthly, 12)
            .unwrap();
        assert!(cov.factors().contains(&FactorId::momentum("MTUM-SPY")));
        assert!(cov.factors().contains(&FactorId::momentum("MTUM-EFA")));
        assert!(cov.factors().contains(&FactorId::value("VLUE-EFA")));
    }

    #[test]
    fn test_peer_average_on_target_periods() {
        let (factors, target) = setup(true);
        let sub = &factors[4];
        assert_eq!(sub.factor, FactorId::sub_industry("AAPL"));
        assert_eq!(sub.series.len(), target.len());
        assert_relative_eq!(sub.series.points()[0].value, 0.05, epsilon = 1e-15);
    }
}
