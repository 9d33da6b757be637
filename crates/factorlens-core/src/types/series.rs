//! Period return series and date alignment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AnalysisWindow, Frequency};
use crate::error::{RiskError, RiskResult};

/// One period return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    /// Period end date.
    pub date: NaiveDate,
    /// Simple return for the period.
    pub value: f64,
}

impl ReturnPoint {
    /// Creates a return point.
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Deserialize)]
struct RawReturnSeries {
    ticker: String,
    #[serde(default)]
    frequency: Frequency,
    points: Vec<ReturnPoint>,
}

/// Ordered period returns for one ticker.
///
/// Dates are strictly increasing and every value is finite; both are checked
/// at construction, including deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReturnSeries")]
pub struct ReturnSeries {
    ticker: String,
    frequency: Frequency,
    points: Vec<ReturnPoint>,
}

impl TryFrom<RawReturnSeries> for ReturnSeries {
    type Error = RiskError;

    fn try_from(raw: RawReturnSeries) -> Result<Self, Self::Error> {
        Self::new(raw.ticker, raw.frequency, raw.points)
    }
}

impl ReturnSeries {
    /// Creates a validated series.
    pub fn new(
        ticker: impl Into<String>,
        frequency: Frequency,
        points: Vec<ReturnPoint>,
    ) -> RiskResult<Self> {
        let ticker = ticker.into();
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(RiskError::data_quality(
                    &ticker,
                    format!(
                        "dates not strictly increasing: {} then {}",
                        pair[0].date, pair[1].date
                    ),
                ));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(RiskError::data_quality(
                &ticker,
                format!("non-finite return on {}", bad.date),
            ));
        }
        Ok(Self {
            ticker,
            frequency,
            points,
        })
    }

    /// Creates a validated series from `(date, return)` pairs.
    pub fn from_pairs(
        ticker: impl Into<String>,
        frequency: Frequency,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> RiskResult<Self> {
        let points = pairs
            .into_iter()
            .map(|(date, value)| ReturnPoint::new(date, value))
            .collect();
        Self::new(ticker, frequency, points)
    }

    /// Ticker the series belongs to.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Sampling frequency.
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// The ordered points.
    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterator over period dates.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    /// Return for `date`, if observed.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.date.cmp(&date))
            .ok()
            .map(|i| self.points[i].value)
    }

    /// Copy of the series restricted to `window`.
    pub fn restrict(&self, window: &AnalysisWindow) -> Self {
        Self {
            ticker: self.ticker.clone(),
            frequency: self.frequency,
            points: self
                .points
                .iter()
                .filter(|p| window.contains(p.date))
                .copied()
                .collect(),
        }
    }

    /// Number of this series' periods that `other` also observes.
    pub fn overlap_count(&self, other: &ReturnSeries) -> usize {
        self.dates().filter(|d| other.value_on(*d).is_some()).count()
    }

    /// Period-by-period difference `self - other` over shared dates.
    pub fn excess_over(&self, other: &ReturnSeries, ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            frequency: self.frequency,
            points: self
                .points
                .iter()
                .filter_map(|p| other.value_on(p.date).map(|o| ReturnPoint::new(p.date, p.value - o)))
                .collect(),
        }
    }
}

/// Returns aligned on the dates every input observes.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedReturns {
    /// Shared dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// One column per input series, in input order.
    pub columns: Vec<Vec<f64>>,
}

impl AlignedReturns {
    /// Number of aligned periods.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Returns true if no period is shared.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Inner join of several series on period date.
///
/// Periods missing from any series are dropped; nothing is forward-filled.
pub fn inner_join(series: &[&ReturnSeries]) -> AlignedReturns {
    let Some((first, rest)) = series.split_first() else {
        return AlignedReturns {
            dates: Vec::new(),
            columns: Vec::new(),
        };
    };

    let dates: Vec<NaiveDate> = first
        .dates()
        .filter(|d| rest.iter().all(|s| s.value_on(*d).is_some()))
        .collect();

    let columns = series
        .iter()
        .map(|s| {
            dates
                .iter()
                .filter_map(|d| s.value_on(*d))
                .collect::<Vec<f64>>()
        })
        .collect();

    AlignedReturns { dates, columns }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(i: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020 + (i / 12) as i32, i % 12 + 1, 1).unwrap()
    }

    fn series(ticker: &str, months: impl IntoIterator<Item = u32>) -> ReturnSeries {
        ReturnSeries::from_pairs(
            ticker,
            Frequency::Monthly,
            months.into_iter().map(|m| (month(m), f64::from(m) * 0.001)),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_duplicate_dates() {
        let result = ReturnSeries::from_pairs(
            "AAPL",
            Frequency::Monthly,
            vec![(month(0), 0.01), (month(0), 0.02)],
        );
        assert!(matches!(result, Err(RiskError::DataQuality { .. })));
    }

    #[test]
    fn test_rejects_unordered_and_nan() {
        let unordered = ReturnSeries::from_pairs(
            "AAPL",
            Frequency::Monthly,
            vec![(month(1), 0.01), (month(0), 0.02)],
        );
        assert!(unordered.is_err());

        let nan = ReturnSeries::from_pairs("AAPL", Frequency::Monthly, vec![(month(0), f64::NAN)]);
        assert!(nan.is_err());
    }

    #[test]
    fn test_inner_join_drops_unaligned() {
        let a = series("A", 0..10);
        let b = series("B", 5..15);
        let c = series("C", (0..20).filter(|m| m % 2 == 0));

        let aligned = inner_join(&[&a, &b, &c]);
        assert_eq!(aligned.dates, vec![month(6), month(8)]);
        assert_eq!(aligned.columns.len(), 3);
        assert_eq!(aligned.columns[1], vec![0.006, 0.008]);
    }

    #[test]
    fn test_overlap_counts_on_target_periods() {
        let target = series("T", 0..36);
        let peer = series("P", 34..40);
        assert_eq!(target.overlap_count(&peer), 2);
        assert_eq!(peer.overlap_count(&target), 2);
    }

    #[test]
    fn test_restrict_and_excess() {
        let a = series("A", 0..12);
        let window = AnalysisWindow::new(month(3), month(5)).unwrap();
        assert_eq!(a.restrict(&window).len(), 3);

        let b = series("B", 0..12);
        let excess = a.excess_over(&b, "A-B");
        assert_eq!(excess.len(), 12);
        assert!(excess.points().iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"ticker":"X","frequency":"monthly","points":[
            {"date":"2020-02-01","value":0.01},{"date":"2020-01-01","value":0.02}]}"#;
        assert!(serde_json::from_str::<ReturnSeries>(json).is_err());
    }
}
