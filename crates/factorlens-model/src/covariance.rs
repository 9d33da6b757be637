//! Factor covariance estimation.

use std::collections::BTreeMap;

use factorlens_core::types::{inner_join, FactorCovariance, FactorId, Frequency, ReturnSeries};
use factorlens_core::{RiskError, RiskResult};
use factorlens_math::statistics::sample_covariance;
use nalgebra::DMatrix;

use crate::factors::FactorReturns;

/// Estimates the covariance of every distinct factor in `factors`.
///
/// Factors are deduplicated by id and ordered by id. One id arriving with
/// two different series is a `DataQuality` error.
/// Returns are aligned by inner join, the covariance uses the n-1
/// denominator, and each factor's worst and best period return is recorded.
/// With no factors (an all-cash portfolio) the result is empty.
pub fn estimate_factor_covariance(
    factors: &[FactorReturns],
    frequency: Frequency,
    min_observations: usize,
) -> RiskResult<FactorCovariance> {
    let mut distinct: BTreeMap<&FactorId, &ReturnSeries> = BTreeMap::new();
    for f in factors {
        let seen = distinct.entry(&f.factor).or_insert(&f.series);
        if *seen != &f.series {
            return Err(RiskError::data_quality(
                f.factor.to_string(),
                "factor supplied with two different return series",
            ));
        }
    }

    if distinct.is_empty() {
        return FactorCovariance::new(Vec::new(), DMatrix::zeros(0, 0), frequency, 0);
    }

    let ids: Vec<FactorId> = distinct.keys().map(|id| (*id).clone()).collect();
    let series: Vec<&ReturnSeries> = distinct.values().copied().collect();
    let aligned = inner_join(&series);

    let n = aligned.len();
    let floor = min_observations.max(2);
    if n < floor {
        return Err(RiskError::data_quality(
            "factor covariance",
            format!(
                "{n} shared observations across {} factors, need at least {floor}",
                ids.len()
            ),
        ));
    }

    let k = ids.len();
    let data = DMatrix::from_fn(n, k, |row, col| aligned.columns[col][row]);
    let matrix = sample_covariance(&data)?;

    let worst = aligned
        .columns
        .iter()
        .map(|c| c.iter().copied().fold(f64::INFINITY, f64::min))
        .collect();
    let best = aligned
        .columns
        .iter()
        .map(|c| c.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        .collect();

    tracing::debug!(factors = k, observations = n, "estimated factor covariance");

    FactorCovariance::new(ids, matrix, frequency, n)?.with_extremes(worst, best)
}
