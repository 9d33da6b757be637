//! Run-scoped return cache.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use factorlens_core::types::{AnalysisWindow, Frequency, ReturnSeries};
use factorlens_core::RiskResult;

type CacheKey = (String, AnalysisWindow, Frequency);

/// Memoizes provider calls for one engine run.
///
/// Concurrent requests for the same key share one fetch. A failed fetch
/// leaves the entry empty, so the next request tries again.
#[derive(Debug, Default)]
pub(crate) struct ReturnCache {
    entries: DashMap<CacheKey, Arc<OnceCell<ReturnSeries>>>,
}

impl ReturnCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached series, running `fetch` if there is none yet.
    pub(crate) async fn get_or_fetch<F, Fut>(
        &self,
        ticker: &str,
        window: &AnalysisWindow,
        frequency: Frequency,
        fetch: F,
    ) -> RiskResult<ReturnSeries>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RiskResult<ReturnSeries>>,
    {
        let cell = self
            .entries
            .entry((ticker.to_string(), *window, frequency))
            .or_default()
            .clone();
        cell.get_or_try_init(fetch).await.cloned()
    }

    /// Number of successfully fetched series.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use factorlens_core::RiskError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        )
        .unwrap()
    }

    fn series(ticker: &str) -> ReturnSeries {
        ReturnSeries::from_pairs(
            ticker,
            Frequency::Monthly,
            [(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(), 0.01)],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetches_once_per_key() {
        let cache = ReturnCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let got = cache
                .get_or_fetch("AAPL", &window(), Frequency::Monthly, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(series("AAPL"))
                })
                .await
                .unwrap();
            assert_eq!(got.ticker(), "AAPL");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A different frequency is a different key.
        cache
            .get_or_fetch("AAPL", &window(), Frequency::Weekly, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(series("AAPL"))
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = ReturnCache::new();
        let failed = cache
            .get_or_fetch("MSFT", &window(), Frequency::Monthly, || async {
                Err(RiskError::data_unavailable("MSFT", "offline"))
            })
            .await;
        assert!(failed.is_err());
        assert_eq!(cache.len(), 0);

        let recovered = cache
            .get_or_fetch("MSFT", &window(), Frequency::Monthly, || async {
                Ok(series("MSFT"))
            })
            .await;
        assert!(recovered.is_ok());
        assert_eq!(cache.len(), 1);
    }
}
