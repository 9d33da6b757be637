//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use factorlens_portfolio::RiskCheckResult;

/// Prints rows as a rounded table, or a placeholder when empty.
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("No results.");
        return;
    }

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string();

    println!("{table}");
}

/// Prints a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Formats a fraction as a percentage.
pub fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Prints a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Prints a warning message.
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message);
}

/// Prints a header for a section.
pub fn print_header(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// A key-value pair for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct KeyValue {
    #[tabled(rename = "Metric")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a key-value pair formatted as a percentage.
    pub fn from_percent(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, pct(value))
    }
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Prints limit checks with a coloured status column.
pub fn print_checks(checks: &RiskCheckResult) {
    print_header("Risk Limits");
    if checks.is_empty() {
        println!("No risk limits configured.");
        return;
    }

    let rows: Vec<CheckRow> = checks
        .checks
        .iter()
        .map(|check| CheckRow {
            limit: check.metric.limit_name().to_string(),
            actual: format!("{:.4}", check.actual),
            threshold: format!("{:.4}", check.limit),
            status: if check.pass {
                "PASS".green().to_string()
            } else {
                "FAIL".red().bold().to_string()
            },
        })
        .collect();
    print_table(&rows);

    let failed = checks.failures().count();
    if failed == 0 {
        print_success("All limits satisfied");
    } else {
        print_warning(&format!("{failed} limit(s) breached"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct() {
        assert_eq!(pct(0.1234), "12.34%");
        assert_eq!(pct(0.0), "0.00%");
    }

    #[test]
    fn test_key_value_percent() {
        let kv = KeyValue::from_percent("Volatility", 0.25);
        assert_eq!(kv.value, "25.00%");
    }
}
