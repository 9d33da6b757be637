//! Historical analysis window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RiskError, RiskResult};

/// Inclusive date range `[start, end]` over which returns are analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl AnalysisWindow {
    /// Creates a window. Fails if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> RiskResult<Self> {
        if start > end {
            return Err(RiskError::configuration(format!(
                "analysis window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// First date in the window.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date in the window.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if `date` lies inside the window (inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for AnalysisWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_inclusive_bounds() {
        let window = AnalysisWindow::new(date(2020, 1, 31), date(2022, 12, 31)).unwrap();
        assert!(window.contains(date(2020, 1, 31)));
        assert!(window.contains(date(2022, 12, 31)));
        assert!(!window.contains(date(2023, 1, 1)));
        assert_eq!(window.to_string(), "2020-01-31..=2022-12-31");
    }

    #[test]
    fn test_reversed_window_rejected() {
        assert!(AnalysisWindow::new(date(2022, 1, 1), date(2021, 1, 1)).is_err());
    }
}
