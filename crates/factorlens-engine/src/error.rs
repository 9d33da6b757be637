//! Mapping collaborator errors into the risk taxonomy.
//!
//! `TraitError` carries no ticker, so the engine attaches the subject it was
//! asking about when the error crosses into [`RiskError`].

use std::time::Duration;

use factorlens_core::RiskError;
use factorlens_traits::TraitError;

/// Converts a return or proxy provider failure for `ticker`.
pub fn provider_error(ticker: &str, error: TraitError) -> RiskError {
    match error {
        TraitError::ProxyNotConfigured(reason) => RiskError::proxy_not_configured(ticker, reason),
        TraitError::ParseError(reason) => RiskError::data_quality(ticker, reason),
        TraitError::InvalidInput(reason) => RiskError::configuration(format!("{ticker}: {reason}")),
        TraitError::DataUnavailable(reason)
        | TraitError::NotFound(reason)
        | TraitError::SourceNotAvailable(reason)
        | TraitError::IoError(reason)
        | TraitError::Internal(reason) => RiskError::data_unavailable(ticker, reason),
        TraitError::Timeout => RiskError::data_unavailable(ticker, "provider timed out"),
        TraitError::RateLimited => RiskError::data_unavailable(ticker, "provider rate limited"),
    }
}

/// Converts a limit source failure for `scope`.
///
/// An unknown scope is a configuration problem, not missing data.
pub fn limit_error(scope: &str, error: TraitError) -> RiskError {
    match error {
        TraitError::NotFound(_) => {
            RiskError::configuration(format!("no risk limits configured for scope {scope}"))
        }
        TraitError::ParseError(reason) | TraitError::InvalidInput(reason) => {
            RiskError::configuration(format!("risk limits for scope {scope}: {reason}"))
        }
        other => provider_error(scope, other),
    }
}

pub(crate) fn timed_out(ticker: &str, timeout: Duration) -> RiskError {
    RiskError::data_unavailable(
        ticker,
        format!("provider call timed out after {} ms", timeout.as_millis()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_variants_are_retryable() {
        for error in [
            TraitError::DataUnavailable("gap".into()),
            TraitError::NotFound("AAPL".into()),
            TraitError::Timeout,
            TraitError::RateLimited,
        ] {
            let mapped = provider_error("AAPL", error);
            assert!(mapped.is_retryable(), "{mapped}");
        }
    }

    #[test]
    fn test_proxy_and_parse_errors_keep_their_meaning() {
        assert!(matches!(
            provider_error("AAPL", TraitError::ProxyNotConfigured("no entry".into())),
            RiskError::ProxyNotConfigured { ticker, .. } if ticker == "AAPL"
        ));
        assert!(matches!(
            provider_error("AAPL", TraitError::ParseError("bad row".into())),
            RiskError::DataQuality { .. }
        ));
    }

    #[test]
    fn test_unknown_scope_is_configuration() {
        assert!(matches!(
            limit_error("desk-7", TraitError::NotFound("desk-7".into())),
            RiskError::Configuration { .. }
        ));
        assert!(limit_error("desk-7", TraitError::Timeout).is_retryable());
    }

    #[test]
    fn test_timeout_message() {
        let err = timed_out("MSFT", Duration::from_millis(250));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("250 ms"));
    }
}
