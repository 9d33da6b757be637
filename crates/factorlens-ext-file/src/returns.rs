//! CSV-backed period returns.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use factorlens_core::types::{AnalysisWindow, Frequency, ReturnSeries};
use factorlens_traits::{ReturnProvider, TraitError};

// =============================================================================
// CSV RETURN PROVIDER
// =============================================================================

/// One row of a returns file.
#[derive(Debug, Deserialize)]
struct ReturnRecord {
    ticker: String,
    date: NaiveDate,
    #[serde(rename = "return")]
    value: f64,
}

/// Period returns read from a long-format CSV file.
///
/// The file has the columns `ticker,date,return`, one row per ticker and
/// period, in any order. Every series in the file is taken to be sampled at
/// the frequency given at construction.
#[derive(Debug)]
pub struct CsvReturnProvider {
    file_path: PathBuf,
    frequency: Frequency,
    series: DashMap<String, ReturnSeries>,
}

impl CsvReturnProvider {
    /// Loads `file_path`, whose returns are sampled at `frequency`.
    pub fn from_path(file_path: impl AsRef<Path>, frequency: Frequency) -> Result<Self, TraitError> {
        let provider = Self {
            file_path: file_path.as_ref().to_path_buf(),
            frequency,
            series: DashMap::new(),
        };
        provider.reload()?;
        Ok(provider)
    }

    /// Re-reads the file, replacing every series.
    pub fn reload(&self) -> Result<(), TraitError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.file_path)
            .map_err(|e| {
                TraitError::IoError(format!("{}: {e}", self.file_path.display()))
            })?;
        let loaded = read_series(reader, self.frequency)?;

        self.series.clear();
        for (ticker, series) in loaded {
            self.series.insert(ticker, series);
        }
        debug!(
            path = %self.file_path.display(),
            tickers = self.series.len(),
            "returns loaded"
        );
        Ok(())
    }

    /// Sampling frequency of every series.
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Tickers with at least one return, sorted.
    pub fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.series.iter().map(|e| e.key().clone()).collect();
        tickers.sort();
        tickers
    }
}

fn read_series<R: Read>(
    mut reader: csv::Reader<R>,
    frequency: Frequency,
) -> Result<BTreeMap<String, ReturnSeries>, TraitError> {
    let mut rows: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for result in reader.deserialize() {
        let record: ReturnRecord = result.map_err(|e| TraitError::ParseError(e.to_string()))?;
        if record.ticker.is_empty() {
            return Err(TraitError::ParseError(format!(
                "empty ticker on {}",
                record.date
            )));
        }
        rows.entry(record.ticker)
            .or_default()
            .push((record.date, record.value));
    }

    rows.into_iter()
        .map(|(ticker, mut pairs)| {
            pairs.sort_by_key(|(date, _)| *date);
            // Duplicate dates and non-finite values are rejected here.
            let series = ReturnSeries::from_pairs(ticker.as_str(), frequency, pairs)
                .map_err(|e| TraitError::ParseError(e.to_string()))?;
            Ok((ticker, series))
        })
        .collect()
}

#[async_trait]
impl ReturnProvider for CsvReturnProvider {
    async fn get_returns(
        &self,
        ticker: &str,
        window: &AnalysisWindow,
        frequency: Frequency,
    ) -> Result<ReturnSeries, TraitError> {
        if frequency != self.frequency {
            return Err(TraitError::InvalidInput(format!(
                "{} holds {} returns, {} requested",
                self.file_path.display(),
                self.frequency,
                frequency
            )));
        }
        let series = self
            .series
            .get(ticker)
            .ok_or_else(|| TraitError::DataUnavailable(format!("no returns for {ticker}")))?;
        let restricted = series.restrict(window);
        if restricted.is_empty() {
            return Err(TraitError::DataUnavailable(format!(
                "no returns for {ticker} in {window}"
            )));
        }
        Ok(restricted)
    }
}
