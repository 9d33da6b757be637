//! Single-asset factor regression.

use std::collections::BTreeMap;

use factorlens_core::config::DataQualityConfig;
use factorlens_core::types::{inner_join, AssetFactorModel, FactorKind, FitDiagnostics, ReturnSeries};
use factorlens_core::{RiskError, RiskResult};
use factorlens_math::regression::ols;
use nalgebra::{DMatrix, DVector};

use crate::factors::FactorReturns;
use crate::resolver::ResolvedProxySet;

/// Fits a holding's returns on its factor returns by OLS.
///
/// Periods are aligned by inner join; nothing is forward-filled. Fails with
/// `DataQuality` when the aligned sample is below `min_observations` or does
/// not exceed the number of parameters, and when any kept peer covers fewer
/// of the target's periods than the target itself.
pub fn fit_asset_model(
    target: &ReturnSeries,
    resolved: &ResolvedProxySet,
    factors: &[FactorReturns],
    config: &DataQualityConfig,
) -> RiskResult<AssetFactorModel> {
    let ticker = resolved.ticker();
    let required = target.len();

    if let Some(short) = resolved
        .kept_peers()
        .iter()
        .find(|p| p.observations < required)
    {
        return Err(RiskError::data_quality(
            ticker,
            format!(
                "peer {} covers {} of {required} periods",
                short.ticker, short.observations
            ),
        ));
    }
    if let Some(sub) = factors
        .iter()
        .find(|f| f.factor.kind() == FactorKind::SubIndustry)
    {
        let covered = target.overlap_count(&sub.series);
        if covered < required {
            return Err(RiskError::data_quality(
                ticker,
                format!("peer factor covers {covered} of {required} periods"),
            ));
        }
    }

    let mut columns: Vec<&ReturnSeries> = Vec::with_capacity(factors.len() + 1);
    columns.push(target);
    columns.extend(factors.iter().map(|f| &f.series));
    let aligned = inner_join(&columns);

    let n = aligned.len();
    let k = factors.len();
    let floor = config.min_observations.max(k + 2);
    if n < floor {
        return Err(RiskError::data_quality(
            ticker,
            format!("{n} aligned observations for {k} factors, need at least {floor}"),
        ));
    }

    let y = DVector::from_column_slice(&aligned.columns[0]);
    let x = DMatrix::from_fn(n, k, |row, col| aligned.columns[col + 1][row]);
    let fit = ols(&y, &x)?;

    let mut betas = BTreeMap::new();
    let mut diagnostics = FitDiagnostics {
        rank_deficient: fit.is_rank_deficient(),
        idiosyncratic_clamped: fit.unexplained_clamped,
        dropped_peers: resolved
            .dropped_peers()
            .iter()
            .map(|p| p.ticker.clone())
            .collect(),
        ..FitDiagnostics::default()
    };
    for (j, f) in factors.iter().enumerate() {
        betas.insert(f.factor.clone(), fit.coefficients[j]);
        diagnostics
            .standard_errors
            .insert(f.factor.clone(), fit.standard_errors[j]);
        diagnostics.t_stats.insert(f.factor.clone(), fit.t_stats[j]);
        diagnostics.p_values.insert(f.factor.clone(), fit.p_values[j]);
    }

    if diagnostics.idiosyncratic_clamped {
        tracing::warn!(ticker, "idiosyncratic variance clamped at zero");
    }
    if diagnostics.rank_deficient {
        tracing::warn!(ticker, rank = fit.rank, factors = k, "collinear factor proxies");
    }
    tracing::debug!(
        ticker,
        observations = n,
        r_squared = fit.r_squared,
        idiosyncratic_variance = fit.unexplained_variance,
        "fitted factor model"
    );

    Ok(
        AssetFactorModel::new(ticker, target.frequency(), betas, fit.unexplained_variance)?
            .with_fit_stats(fit.intercept, fit.r_squared, n, diagnostics),
    )
}
