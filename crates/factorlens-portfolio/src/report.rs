//! Stateless projections of risk results.
//!
//! `to_report` renders a plain-text block for logs and terminals;
//! `to_wire` builds the JSON payload handed to outer layers. Neither
//! recomputes anything.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use factorlens_core::types::FactorId;
use serde_json::{json, Map, Value};

use crate::aggregator::PortfolioRiskSummary;
use crate::limits::RiskCheckResult;

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn labelled(map: &BTreeMap<FactorId, f64>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.to_string(), json!(v))).collect()
}

impl PortfolioRiskSummary {
    /// Plain-text report.
    pub fn to_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Portfolio risk ({} returns, annualized)", self.frequency);
        let _ = writeln!(out, "  volatility        {}", pct(self.volatility));
        let _ = writeln!(
            out,
            "  factor variance   {:.6} ({} of total)",
            self.factor_variance,
            pct(self.factor_share())
        );
        let _ = writeln!(out, "  idio variance     {:.6}", self.idiosyncratic_variance);
        let _ = writeln!(out, "  herfindahl        {:.4}", self.herfindahl);
        let _ = writeln!(
            out,
            "  gross / net       {:.4} / {:.4}",
            self.gross_exposure, self.net_exposure
        );
        if let Some(loss) = self.max_single_factor_loss {
            let _ = writeln!(out, "  worst factor loss {}", pct(loss));
        }

        let _ = writeln!(out, "Factors");
        for (factor, beta) in &self.portfolio_betas {
            let contribution = self.factor_contributions.get(factor).copied().unwrap_or(0.0);
            let _ = writeln!(
                out,
                "  {:<28} beta {beta:>8.4}  variance {contribution:>10.6}",
                factor.to_string()
            );
        }

        let _ = writeln!(out, "Positions");
        for p in &self.positions {
            let _ = writeln!(
                out,
                "  {:<12} weight {:>8.4}  risk {:>8.4}  share {:>8}",
                p.ticker,
                p.weight,
                p.risk_contribution,
                pct(p.share_of_variance)
            );
        }
        out
    }

    /// JSON payload with string map keys.
    pub fn to_wire(&self) -> Value {
        let kind_shares: Map<String, Value> = self
            .kind_shares
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), json!(v)))
            .collect();
        let positions: Vec<Value> = self
            .positions
            .iter()
            .map(|p| {
                json!({
                    "ticker": p.ticker,
                    "weight": p.weight,
                    "variance_contribution": p.variance_contribution,
                    "risk_contribution": p.risk_contribution,
                    "share_of_variance": p.share_of_variance,
                })
            })
            .collect();

        json!({
            "frequency": self.frequency.to_string(),
            "volatility": self.volatility,
            "total_variance": self.total_variance,
            "factor_variance": self.factor_variance,
            "idiosyncratic_variance": self.idiosyncratic_variance,
            "factor_share": self.factor_share(),
            "factor_contributions": labelled(&self.factor_contributions),
            "kind_shares": kind_shares,
            "portfolio_betas": labelled(&self.portfolio_betas),
            "factor_losses": labelled(&self.factor_losses),
            "max_single_factor_loss": self.max_single_factor_loss,
            "herfindahl": self.herfindahl,
            "gross_exposure": self.gross_exposure,
            "net_exposure": self.net_exposure,
            "max_position_weight": self.max_position_weight,
            "positions": positions,
        })
    }
}

impl RiskCheckResult {
    /// Plain-text report, one line per check.
    pub fn to_report(&self) -> String {
        if self.checks.is_empty() {
            return "No risk limits configured\n".to_string();
        }
        let mut out = String::new();
        for check in &self.checks {
            let _ = writeln!(
                out,
                "  [{}] {:<24} actual {:>10.6}  limit {:>10.6}",
                if check.pass { "PASS" } else { "FAIL" },
                check.metric.limit_name(),
                check.actual,
                check.limit
            );
        }
        out
    }

    /// JSON payload.
    pub fn to_wire(&self) -> Value {
        let checks: Vec<Value> = self
            .checks
            .iter()
            .map(|c| {
                json!({
                    "metric": c.metric.limit_name(),
                    "actual": c.actual,
                    "limit": c.limit,
                    "pass": c.pass,
                })
            })
            .collect();
        json!({ "all_passed": self.all_passed(), "checks": checks })
    }
}
