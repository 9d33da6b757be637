//! File adapters against real files, alone and wired into an engine.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::TempDir;

use factorlens_core::config::EngineConfig;
use factorlens_core::types::{AnalysisWindow, Frequency, LimitMetric};
use factorlens_engine::prelude::*;
use factorlens_ext_file::{
    load_expected_returns_csv, load_holdings_csv, CsvReturnProvider, TomlLimitSource,
    TomlProxySource,
};
use factorlens_traits::{ReturnProvider, TraitError};

// =============================================================================
// FIXTURES
// =============================================================================

fn month(i: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019 + (i / 12) as i32, i % 12 + 1, 1).unwrap()
}

fn window() -> AnalysisWindow {
    AnalysisWindow::new(
        NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
    )
    .unwrap()
}

fn simple_hash(seed: u32) -> f64 {
    ((f64::from(seed) * 12.9898).sin() * 43758.5453).fract()
}

fn wave(i: u32, freq: f64, amp: f64) -> f64 {
    (f64::from(i) * freq).sin() * amp
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn returns_csv() -> String {
    let spy = |m| wave(m, 0.9, 0.04) + 0.005;
    let xlk = |m| wave(m, 0.4, 0.05);
    let mut csv = String::from("ticker,date,return\n");
    for m in 0..36 {
        let rows = [
            ("SPY", spy(m)),
            ("MTUM", wave(m, 1.7, 0.03)),
            ("VLUE", wave(m, 2.3, 0.02)),
            ("XLK", xlk(m)),
            ("AAPL", 1.1 * spy(m) + 0.3 * xlk(m) + 0.01 * simple_hash(m)),
            ("MSFT", 0.9 * spy(m) + 0.5 * xlk(m) + 0.01 * simple_hash(m + 100)),
        ];
        for (ticker, value) in rows {
            writeln!(csv, "{ticker},{},{value}", month(m)).unwrap();
        }
    }
    csv
}

const PROXIES: &str = r#"
[proxies.AAPL]
market = "SPY"
momentum = "MTUM"
value = "VLUE"
industry = "XLK"
peers = ["MSFT"]

[proxies.CASH]
"#;

const LIMITS: &str = r#"
[scopes.default]
max_volatility = 0.50
max_single_stock_weight = 0.40
"#;

// =============================================================================
// CSV RETURN PROVIDER
// =============================================================================

#[tokio::test]
async fn test_returns_restricted_to_window() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "returns.csv", &returns_csv());
    let provider = CsvReturnProvider::from_path(&path, Frequency::Monthly).unwrap();

    assert_eq!(provider.tickers().len(), 6);
    let year = AnalysisWindow::new(
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
    )
    .unwrap();
    let spy = provider
        .get_returns("SPY", &year, Frequency::Monthly)
        .await
        .unwrap();
    assert_eq!(spy.len(), 12);
    assert_eq!(spy.ticker(), "SPY");
}

#[tokio::test]
async fn test_unknown_ticker_and_empty_window_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "returns.csv", &returns_csv());
    let provider = CsvReturnProvider::from_path(&path, Frequency::Monthly).unwrap();

    let err = provider
        .get_returns("TSLA", &window(), Frequency::Monthly)
        .await
        .unwrap_err();
    assert!(matches!(err, TraitError::DataUnavailable(_)));

    let later = AnalysisWindow::new(
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    )
    .unwrap();
    let err = provider
        .get_returns("SPY", &later, Frequency::Monthly)
        .await
        .unwrap_err();
    assert!(matches!(err, TraitError::DataUnavailable(_)));
}

#[tokio::test]
async fn test_frequency_mismatch_is_invalid_input() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "returns.csv", &returns_csv());
    let provider = CsvReturnProvider::from_path(&path, Frequency::Monthly).unwrap();

    let err = provider
        .get_returns("SPY", &window(), Frequency::Daily)
        .await
        .unwrap_err();
    assert!(matches!(err, TraitError::InvalidInput(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = CsvReturnProvider::from_path(dir.path().join("nope.csv"), Frequency::Monthly)
        .unwrap_err();
    assert!(matches!(err, TraitError::IoError(_)));
}

#[tokio::test]
async fn test_reload_picks_up_new_rows() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "returns.csv",
        "ticker,date,return\nSPY,2019-01-31,0.01\n",
    );
    let provider = CsvReturnProvider::from_path(&path, Frequency::Monthly).unwrap();
    assert_eq!(provider.tickers(), vec!["SPY"]);

    write(
        dir.path(),
        "returns.csv",
        "ticker,date,return\nSPY,2019-01-31,0.01\nQQQ,2019-01-31,0.02\n",
    );
    provider.reload().unwrap();
    assert_eq!(provider.tickers(), vec!["QQQ", "SPY"]);
}

// =============================================================================
// PORTFOLIO INPUTS
// =============================================================================

#[test]
fn test_holdings_with_optional_dollars() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "holdings.csv",
        "ticker,weight,dollar_exposure\nAAPL,0.6,600000\nCASH,0.4,\n",
    );
    let holdings = load_holdings_csv(&path).unwrap();

    assert_eq!(holdings.len(), 2);
    assert_eq!(holdings[0].ticker, "AAPL");
    assert_eq!(holdings[0].dollar_exposure, Some(600000.0));
    assert_eq!(holdings[1].weight, 0.4);
    assert_eq!(holdings[1].dollar_exposure, None);
}

#[test]
fn test_holdings_without_dollar_column() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "holdings.csv", "ticker,weight\nAAPL,-0.25\n");
    let holdings = load_holdings_csv(&path).unwrap();
    assert_eq!(holdings[0].weight, -0.25);
}

#[test]
fn test_expected_returns_reject_duplicates() {
    let dir = TempDir::new().unwrap();
    let good = write(
        dir.path(),
        "mu.csv",
        "ticker,expected_return\nAAPL,0.08\nCASH,0.02\n",
    );
    let expected = load_expected_returns_csv(&good).unwrap();
    assert_eq!(expected["AAPL"], 0.08);

    let bad = write(
        dir.path(),
        "dup.csv",
        "ticker,expected_return\nAAPL,0.08\nAAPL,0.09\n",
    );
    assert!(matches!(
        load_expected_returns_csv(&bad),
        Err(TraitError::ParseError(_))
    ));
}

// =============================================================================
// ENGINE WIRING
// =============================================================================

#[tokio::test]
async fn test_engine_over_files() {
    let dir = TempDir::new().unwrap();
    let returns = write(dir.path(), "returns.csv", &returns_csv());
    let proxies = write(dir.path(), "proxies.toml", PROXIES);
    let limits = write(dir.path(), "limits.toml", LIMITS);
    let holdings = write(dir.path(), "holdings.csv", "ticker,weight\nAAPL,0.6\nCASH,0.4\n");

    let engine = RiskEngineBuilder::new()
        .with_config(EngineConfig::default())
        .with_returns(CsvReturnProvider::from_path(&returns, Frequency::Monthly).unwrap())
        .with_proxies(TomlProxySource::from_path(&proxies).unwrap())
        .with_limits(TomlLimitSource::from_path(&limits).unwrap())
        .build()
        .unwrap();

    let holdings = load_holdings_csv(&holdings).unwrap();
    let analysis = engine
        .analyze_scope(&holdings, &window(), "default")
        .await
        .unwrap();

    assert_eq!(analysis.fitted.models[0].observations, 36);
    let cash = analysis.summary.position("CASH").unwrap();
    assert_eq!(cash.variance_contribution, 0.0);

    // AAPL at 0.6 breaches the 0.40 position limit; the volatility limit holds.
    let failed: Vec<LimitMetric> = analysis.checks.failures().map(|c| c.metric).collect();
    assert_eq!(failed, vec![LimitMetric::PositionWeight]);
}
