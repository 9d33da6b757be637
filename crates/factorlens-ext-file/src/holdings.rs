//! CSV portfolio inputs: holdings and expected returns.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use factorlens_core::types::Holding;
use factorlens_traits::TraitError;

#[derive(Debug, Deserialize)]
struct HoldingRecord {
    ticker: String,
    weight: f64,
    #[serde(default)]
    dollar_exposure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExpectedReturnRecord {
    ticker: String,
    expected_return: f64,
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, TraitError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| TraitError::IoError(format!("{}: {e}", path.display())))
}

/// Reads holdings from a CSV file with columns `ticker,weight[,dollar_exposure]`.
///
/// Rows keep file order. Duplicate tickers and weight sanity are checked by
/// the engine, not here.
pub fn load_holdings_csv(path: impl AsRef<Path>) -> Result<Vec<Holding>, TraitError> {
    let mut reader = open(path.as_ref())?;
    reader
        .deserialize()
        .map(|result| {
            let record: HoldingRecord =
                result.map_err(|e| TraitError::ParseError(e.to_string()))?;
            let holding = Holding::new(record.ticker, record.weight);
            Ok(match record.dollar_exposure {
                Some(dollars) => holding.with_dollar_exposure(dollars),
                None => holding,
            })
        })
        .collect()
}

/// Reads per-ticker expected returns from a CSV file with columns
/// `ticker,expected_return`.
pub fn load_expected_returns_csv(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<String, f64>, TraitError> {
    let mut reader = open(path.as_ref())?;
    let mut expected = BTreeMap::new();
    for result in reader.deserialize() {
        let record: ExpectedReturnRecord =
            result.map_err(|e| TraitError::ParseError(e.to_string()))?;
        if !record.expected_return.is_finite() {
            return Err(TraitError::ParseError(format!(
                "non-finite expected return for {}",
                record.ticker
            )));
        }
        if expected
            .insert(record.ticker.clone(), record.expected_return)
            .is_some()
        {
            return Err(TraitError::ParseError(format!(
                "duplicate expected return for {}",
                record.ticker
            )));
        }
    }
    Ok(expected)
}
