//! Property-based tests for aggregation invariants.
//!
//! These hold for any weights, betas and PSD factor covariance:
//! - Factor plus idiosyncratic variance equals total variance
//! - Euler risk contributions sum to volatility
//! - Variance contributions sum to total variance
//! - Aggregating twice gives bit-identical output

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use factorlens_core::types::{AssetFactorModel, FactorCovariance, FactorId, Frequency, Holding};
use factorlens_portfolio::prelude::*;
use nalgebra::DMatrix;
use proptest::prelude::*;

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

fn simple_hash(seed: u64, i: u64) -> u64 {
    let mut x = seed.wrapping_add(i).wrapping_mul(0x517cc1b727220a95);
    x ^= x >> 32;
    x = x.wrapping_mul(0x517cc1b727220a95);
    x ^= x >> 32;
    x
}

/// Uniform-ish value in `[lo, hi)`.
fn unit(seed: u64, i: u64, lo: f64, hi: f64) -> f64 {
    lo + (simple_hash(seed, i) % 10_000) as f64 / 10_000.0 * (hi - lo)
}

fn factor_ids(k: usize) -> Vec<FactorId> {
    let mut ids = vec![
        FactorId::market("SPY"),
        FactorId::momentum("MTUM"),
        FactorId::value("VLUE"),
    ];
    ids.extend((0..k.saturating_sub(3)).map(|j| FactorId::industry(format!("IND{j}"))));
    ids.truncate(k);
    ids
}

/// Random PSD covariance `A Aᵀ / k` with monthly-scale entries.
fn generate_covariance(k: usize, seed: u64) -> FactorCovariance {
    let a = DMatrix::from_fn(k, k, |i, j| unit(seed, (i * k + j) as u64, -0.05, 0.05));
    let matrix = &a * a.transpose() / k as f64;
    let worst = (0..k).map(|j| unit(seed, 500 + j as u64, -0.2, -0.01)).collect();
    let best = (0..k).map(|j| unit(seed, 600 + j as u64, 0.01, 0.2)).collect();
    FactorCovariance::new(factor_ids(k), matrix, Frequency::Monthly, 60)
        .unwrap()
        .with_extremes(worst, best)
        .unwrap()
}

fn generate_portfolio(n: usize, k: usize, seed: u64) -> (Vec<Holding>, Vec<AssetFactorModel>) {
    let factors = factor_ids(k);
    let mut holdings = Vec::with_capacity(n);
    let mut models = Vec::with_capacity(n);

    for i in 0..n {
        let ticker = format!("T{i:03}");
        let base = 1_000 * (i as u64 + 1);
        let betas: BTreeMap<FactorId, f64> = factors
            .iter()
            .enumerate()
            // every third asset skips the last factor
            .filter(|(j, _)| !(i % 3 == 0 && *j == k - 1))
            .map(|(j, f)| (f.clone(), unit(seed, base + j as u64, -0.5, 1.5)))
            .collect();
        let idio = unit(seed, base + 999, 0.0005, 0.005);
        models.push(AssetFactorModel::new(ticker.clone(), Frequency::Monthly, betas, idio).unwrap());
        holdings.push(Holding::new(ticker, unit(seed, base + 777, -0.5, 1.0)));
    }
    (holdings, models)
}

// =============================================================================
// DECOMPOSITION
// =============================================================================

#[test]
fn property_factor_plus_idio_is_total() {
    for seed in 0..50 {
        let (holdings, models) = generate_portfolio(12, 5, seed);
        let cov = generate_covariance(5, seed);
        let s = aggregate(&holdings, &models, &cov).unwrap();
        assert_relative_eq!(
            s.factor_variance + s.idiosyncratic_variance,
            s.total_variance,
            max_relative = 1e-9
        );
        assert!(s.factor_variance >= -1e-15);
        assert!(s.idiosyncratic_variance > 0.0);
    }
}

#[test]
fn property_factor_contributions_sum_to_factor_variance() {
    for seed in 0..50 {
        let (holdings, models) = generate_portfolio(8, 4, seed);
        let cov = generate_covariance(4, seed);
        let s = aggregate(&holdings, &models, &cov).unwrap();
        let sum: f64 = s.factor_contributions.values().sum();
        let scale: f64 = s.factor_contributions.values().map(|c| c.abs()).sum();
        assert!((sum - s.factor_variance).abs() <= 1e-12 * scale.max(1e-12));
        let kinds: f64 = s.kind_shares.values().sum();
        assert!((kinds - s.factor_share()).abs() <= 1e-9 * (scale / s.total_variance).max(1.0));
    }
}

// =============================================================================
// EULER CONSISTENCY
// =============================================================================

#[test]
fn property_risk_contributions_sum_to_volatility() {
    for seed in 0..100 {
        let n = 2 + (seed as usize % 20);
        let (holdings, models) = generate_portfolio(n, 6, seed);
        let cov = generate_covariance(6, seed);
        let s = aggregate(&holdings, &models, &cov).unwrap();
        assert_relative_eq!(s.risk_contribution_total(), s.volatility, max_relative = 1e-6);
        assert_relative_eq!(
            s.variance_contribution_total(),
            s.total_variance,
            max_relative = 1e-6
        );
    }
}

// =============================================================================
// DETERMINISM
// =============================================================================

#[test]
fn property_aggregate_is_idempotent() {
    for seed in 0..20 {
        let (holdings, models) = generate_portfolio(30, 7, seed);
        let cov = generate_covariance(7, seed);
        let a = aggregate(&holdings, &models, &cov).unwrap();
        let b = aggregate(&holdings, &models, &cov).unwrap();
        assert_eq!(a.volatility.to_bits(), b.volatility.to_bits());
        assert_eq!(
            serde_json::to_string(&a.to_wire()).unwrap(),
            serde_json::to_string(&b.to_wire()).unwrap()
        );
        assert_eq!(a, b);
    }
}

// =============================================================================
// ARBITRARY WEIGHTS
// =============================================================================

proptest! {
    #[test]
    fn proptest_euler_any_weights(
        weights in prop::collection::vec(-2.0f64..2.0, 2..16),
        seed in 0u64..1_000,
    ) {
        let (mut holdings, models) = generate_portfolio(weights.len(), 4, seed);
        for (h, w) in holdings.iter_mut().zip(&weights) {
            h.weight = *w;
        }
        let cov = generate_covariance(4, seed);
        let s = aggregate(&holdings, &models, &cov).unwrap();

        if s.total_variance > 0.0 {
            let rc = s.risk_contribution_total();
            prop_assert!((rc - s.volatility).abs() <= 1e-6 * s.volatility);
        } else {
            prop_assert!(s.positions.iter().all(|p| p.risk_contribution == 0.0));
        }
        let additive = s.factor_variance + s.idiosyncratic_variance;
        prop_assert!((additive - s.total_variance).abs() <= 1e-9 * s.total_variance.abs().max(1e-300));

        let hhi: f64 = weights.iter().map(|w| w * w).sum();
        prop_assert!((s.herfindahl - hhi).abs() <= 1e-12 * hhi.max(1.0));
    }
}
