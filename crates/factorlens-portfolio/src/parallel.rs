//! Parallel processing utilities for portfolio aggregation.
//!
//! Provides conditional parallel iteration based on configuration
//! and collection size. Uses rayon when the `parallel` feature is enabled.
//! Collection preserves input order, so results do not depend on whether
//! the parallel path ran.

use factorlens_core::config::AggregationConfig;

/// Returns true if parallel processing should be used for `count` items.
#[must_use]
pub fn should_parallelize(config: &AggregationConfig, count: usize) -> bool {
    cfg!(feature = "parallel") && config.parallel && count >= config.parallel_threshold
}

/// Maps a function over items, conditionally using parallel iteration.
///
/// Uses parallel iteration when:
/// - The `parallel` feature is enabled
/// - `config.parallel` is true
/// - The collection size reaches `config.parallel_threshold`
#[allow(unused_variables)]
pub fn maybe_parallel_map<T, U, F>(items: &[T], config: &AggregationConfig, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if should_parallelize(config, items.len()) {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maybe_parallel_map_preserves_order() {
        let items: Vec<u32> = (0..1_000).collect();
        let sequential = AggregationConfig {
            parallel: false,
            parallel_threshold: 1,
        };
        let parallel = AggregationConfig {
            parallel: true,
            parallel_threshold: 1,
        };

        let a = maybe_parallel_map(&items, &sequential, |x| x * 2);
        let b = maybe_parallel_map(&items, &parallel, |x| x * 2);
        assert_eq!(a, b);
        assert_eq!(a[999], 1998);
    }

    #[test]
    fn test_threshold() {
        let config = AggregationConfig {
            parallel: true,
            parallel_threshold: 100,
        };
        assert!(!should_parallelize(&config, 99));
        assert_eq!(should_parallelize(&config, 100), cfg!(feature = "parallel"));
    }
}
