//! End-to-end runs of the `factorlens` binary against temporary files.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// FIXTURES
// =============================================================================

fn simple_hash(seed: u32) -> f64 {
    ((f64::from(seed) * 12.9898).sin() * 43758.5453).fract()
}

fn wave(i: u32, freq: f64, amp: f64) -> f64 {
    (f64::from(i) * freq).sin() * amp
}

fn returns_csv() -> String {
    let spy = |m| wave(m, 0.9, 0.04) + 0.005;
    let xlk = |m| wave(m, 0.4, 0.05);
    let mut csv = String::from("ticker,date,return\n");
    for m in 0..36u32 {
        let date = format!("{}-{:02}-01", 2019 + m / 12, m % 12 + 1);
        let rows = [
            ("SPY", spy(m)),
            ("MTUM", wave(m, 1.7, 0.03)),
            ("VLUE", wave(m, 2.3, 0.02)),
            ("XLK", xlk(m)),
            ("AAPL", 1.1 * spy(m) + 0.3 * xlk(m) + 0.01 * simple_hash(m)),
            ("MSFT", 0.9 * spy(m) + 0.5 * xlk(m) + 0.01 * simple_hash(m + 100)),
        ];
        for (ticker, value) in rows {
            writeln!(csv, "{ticker},{date},{value}").unwrap();
        }
    }
    csv
}

const ENGINE: &str = r#"
[data_quality]
min_observations = 12

[factors]
frequency = "monthly"
"#;

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

[scopes.loose]
max_volatility = 0.50
"#;

struct Files {
    _dir: TempDir,
    root: PathBuf,
}

impl Files {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        write(&root, "engine.toml", ENGINE);
        write(&root, "returns.csv", &returns_csv());
        write(&root, "proxies.toml", PROXIES);
        write(&root, "limits.toml", LIMITS);
        write(&root, "holdings.csv", "ticker,weight\nAAPL,0.6\nCASH,0.4\n");
        write(&root, "mu.csv", "ticker,expected_return\nAAPL,0.10\nCASH,0.02\n");
        Self { _dir: dir, root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn run(&self, command: &str) -> Command {
        let mut cmd = Command::cargo_bin("factorlens").unwrap();
        cmd.env_remove("RUST_LOG")
            .env_remove("FACTORLENS_CONFIG")
            .arg(command)
            .arg("--config")
            .arg(self.path("engine.toml"));
        cmd
    }

    fn run_with_inputs(&self, command: &str) -> Command {
        let mut cmd = self.run(command);
        cmd.arg("--returns")
            .arg(self.path("returns.csv"))
            .arg("--proxies")
            .arg(self.path("proxies.toml"))
            .arg("--limits")
            .arg(self.path("limits.toml"))
            .arg("--holdings")
            .arg(self.path("holdings.csv"))
            .args(["--start", "2019-01-01", "--end", "2021-12-31"]);
        cmd
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--format").arg("json").output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// CHECK-CONFIG
// =============================================================================

#[test]
fn test_check_config_valid() {
    let files = Files::new();
    files
        .run("check-config")
        .arg("--limits")
        .arg(files.path("limits.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("loose"));
}

#[test]
fn test_check_config_rejects_bad_floor() {
    let files = Files::new();
    write(&files.root, "engine.toml", "[data_quality]\nmin_observations = 2\n");
    files
        .run("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_observations"));
}

// =============================================================================
// ANALYZE
// =============================================================================

#[test]
fn test_analyze_reports_breach_without_failing() {
    let files = Files::new();
    let json = json_stdout(&mut files.run_with_inputs("analyze"));

    assert!(json["summary"]["volatility"].as_f64().unwrap() > 0.0);
    let checks = json["checks"].to_string();
    assert!(checks.contains("max_position_weight"));
    assert_eq!(json["window"]["start"], "2019-01-01");
}

#[test]
fn test_analyze_table_output() {
    let files = Files::new();
    files
        .run_with_inputs("analyze")
        .assert()
        .success()
        .stdout(predicate::str::contains("Positions"))
        .stdout(predicate::str::contains("AAPL"))
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn test_analyze_bad_date() {
    let files = Files::new();
    files
        .run("analyze")
        .arg("--returns")
        .arg(files.path("returns.csv"))
        .arg("--proxies")
        .arg(files.path("proxies.toml"))
        .arg("--holdings")
        .arg(files.path("holdings.csv"))
        .args(["--start", "01/01/2019", "--end", "2021-12-31"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date format"));
}

// =============================================================================
// OPTIMIZE
// =============================================================================

#[test]
fn test_optimize_min_variance_moves_to_cash() {
    let files = Files::new();
    let json = json_stdout(
        files
            .run_with_inputs("optimize")
            .args(["--scope", "loose", "--objective", "min-variance"]),
    );

    assert_eq!(json["status"]["status"], "converged");
    let cash = json["weights"]
        .as_array()
        .unwrap()
        .iter()
        .find(|h| h["ticker"] == "CASH")
        .unwrap();
    assert!(cash["weight"].as_f64().unwrap() > 0.99);
}

#[test]
fn test_optimize_infeasible_exits_non_zero() {
    let files = Files::new();
    // Two holdings capped at 0.40 each cannot sum to one.
    files
        .run_with_inputs("optimize")
        .assert()
        .failure()
        .stdout(predicate::str::contains("infeasible"));
}

#[test]
fn test_max_return_needs_expected_returns() {
    let files = Files::new();
    files
        .run_with_inputs("optimize")
        .args(["--scope", "loose", "--objective", "max-return"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--expected-returns"));
}

#[test]
fn test_max_return_with_expected_returns() {
    let files = Files::new();
    let json = json_stdout(
        files
            .run_with_inputs("optimize")
            .args(["--scope", "loose", "--objective", "max-return"])
            .arg("--expected-returns")
            .arg(files.path("mu.csv"))
            .args(["--upper", "0.7"]),
    );

    assert_eq!(json["objective"], "max_return");
    let aapl = json["weights"]
        .as_array()
        .unwrap()
        .iter()
        .find(|h| h["ticker"] == "AAPL")
        .unwrap();
    assert!((aapl["weight"].as_f64().unwrap() - 0.7).abs() < 1e-3);
}
