//! Argument errors caught before a run reaches the engine.

use thiserror::Error;

/// Bad command-line input. Engine failures travel as `RiskError` instead.
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--start`/`--end` window bound that is not an ISO calendar date.
    #[error("cannot read window date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The chosen objective needs an input file that was not passed.
    #[error("objective `{objective}` requires {flag}")]
    MissingInput {
        objective: &'static str,
        flag: &'static str,
    },
}

pub type CliResult<T> = Result<T, CliError>;
