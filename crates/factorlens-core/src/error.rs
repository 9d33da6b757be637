//! Error types for the factorlens engine.
//!
//! Every layer above the numerical kernels reports failures as a
//! [`RiskError`]. The variants are deliberately coarse: callers decide
//! whether to retry, exclude a ticker, or fix configuration based on the
//! variant alone.

use factorlens_math::MathError;
use thiserror::Error;

/// A specialized Result type for risk operations.
pub type RiskResult<T> = Result<T, RiskError>;

/// The main error type for risk operations.
#[derive(Error, Debug, Clone)]
pub enum RiskError {
    /// Insufficient or misaligned history for a ticker, peer or factor.
    #[error("Data quality error for {subject}: {reason}")]
    DataQuality {
        /// Ticker or factor the problem was found on.
        subject: String,
        /// Description of the problem.
        reason: String,
    },

    /// A non-cash ticker has no complete factor proxy set.
    #[error("Factor proxies not configured for {ticker}: {reason}")]
    ProxyNotConfigured {
        /// Ticker whose proxies are missing.
        ticker: String,
        /// What is missing.
        reason: String,
    },

    /// The return provider could not serve a ticker or window.
    #[error("Data unavailable for {ticker}: {reason}")]
    DataUnavailable {
        /// Ticker that could not be served.
        ticker: String,
        /// Provider-side reason.
        reason: String,
    },

    /// No weights within bounds satisfy the constraints.
    #[error("Infeasible constraints: {constraint}")]
    InfeasibleConstraints {
        /// The violated constraint(s).
        constraint: String,
    },

    /// The optimizer exhausted its iteration budget.
    #[error("No convergence after {iterations} iterations: {reason}")]
    NonConvergence {
        /// Iterations used.
        iterations: u32,
        /// Diagnostic.
        reason: String,
    },

    /// Malformed configuration, limit set, bounds or inputs.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Description of the problem.
        reason: String,
    },

    /// Numerical failure in a kernel.
    #[error("Numerical error: {0}")]
    Math(#[from] MathError),
}

impl RiskError {
    /// Creates a data quality error.
    #[must_use]
    pub fn data_quality(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataQuality {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Creates a proxy-not-configured error.
    #[must_use]
    pub fn proxy_not_configured(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProxyNotConfigured {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }

    /// Creates a data unavailable error.
    #[must_use]
    pub fn data_unavailable(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }

    /// Creates an infeasible constraints error.
    #[must_use]
    pub fn infeasible(constraint: impl Into<String>) -> Self {
        Self::InfeasibleConstraints {
            constraint: constraint.into(),
        }
    }

    /// Creates a non-convergence error.
    #[must_use]
    pub fn non_convergence(iterations: u32, reason: impl Into<String>) -> Self {
        Self::NonConvergence {
            iterations,
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns true if the caller may retry the operation.
    ///
    /// Only provider-side unavailability is retryable; the engine itself
    /// never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RiskError::data_quality("AAPL", "only 5 observations");
        assert!(err.to_string().contains("AAPL"));
        assert!(err.to_string().contains("only 5 observations"));

        let err = RiskError::non_convergence(500, "penalty still growing");
        assert!(err.to_string().contains("500 iterations"));
    }

    #[test]
    fn test_retryable() {
        assert!(RiskError::data_unavailable("MSFT", "timeout").is_retryable());
        assert!(!RiskError::configuration("bad").is_retryable());
        assert!(!RiskError::proxy_not_configured("X", "no market").is_retryable());
    }

    #[test]
    fn test_from_math_error() {
        let err: RiskError = MathError::insufficient_data(12, 3).into();
        assert!(matches!(err, RiskError::Math(_)));
    }
}
