//! # factorlens Ext File
//!
//! File-backed collaborators for the factorlens risk engine.
//!
//! - [`CsvReturnProvider`]: long-format `ticker,date,return` CSV
//! - [`TomlProxySource`]: `[proxies.<TICKER>]` tables
//! - [`TomlLimitSource`]: `[scopes.<id>]` tables
//! - [`load_holdings_csv`] and [`load_expected_returns_csv`] for portfolio inputs
//!
//! Files are read once at construction and can be re-read with `reload`.
//! Lookups never touch the filesystem.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod holdings;
mod limits;
mod proxies;
mod returns;

pub use holdings::{load_expected_returns_csv, load_holdings_csv};
pub use limits::TomlLimitSource;
pub use proxies::TomlProxySource;
pub use returns::CsvReturnProvider;

use std::path::Path;

use factorlens_traits::TraitError;

pub(crate) fn read_file(path: &Path) -> Result<String, TraitError> {
    std::fs::read_to_string(path)
        .map_err(|e| TraitError::IoError(format!("{}: {e}", path.display())))
}
