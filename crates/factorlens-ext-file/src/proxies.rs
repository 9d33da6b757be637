//! TOML-backed factor proxy sets.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use factorlens_core::types::FactorProxySet;
use factorlens_traits::{ProxySource, TraitError};

use crate::read_file;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProxyFile {
    #[serde(default)]
    proxies: BTreeMap<String, FactorProxySet>,
}

/// Proxy sets read from `[proxies.<TICKER>]` tables.
///
/// ```toml
/// [proxies.AAPL]
/// market = "SPY"
/// momentum = "MTUM"
/// value = "VLUE"
/// industry = "XLK"
/// peers = ["MSFT", "GOOGL"]
///
/// # An empty table marks a cash-like holding.
/// [proxies.CASH]
/// ```
#[derive(Debug)]
pub struct TomlProxySource {
    file_path: PathBuf,
    proxies: DashMap<String, FactorProxySet>,
}

impl TomlProxySource {
    /// Loads `file_path`.
    pub fn from_path(file_path: impl AsRef<Path>) -> Result<Self, TraitError> {
        let source = Self {
            file_path: file_path.as_ref().to_path_buf(),
            proxies: DashMap::new(),
        };
        source.reload()?;
        Ok(source)
    }

    /// Parses proxy tables from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, TraitError> {
        let source = Self {
            file_path: PathBuf::new(),
            proxies: DashMap::new(),
        };
        source.replace(parse(content)?);
        Ok(source)
    }

    /// Re-reads the file, replacing every proxy set.
    pub fn reload(&self) -> Result<(), TraitError> {
        let content = read_file(&self.file_path)?;
        self.replace(parse(&content)?);
        debug!(
            path = %self.file_path.display(),
            tickers = self.proxies.len(),
            "proxy sets loaded"
        );
        Ok(())
    }

    /// Number of configured tickers.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Returns true if no ticker is configured.
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    fn replace(&self, proxies: BTreeMap<String, FactorProxySet>) {
        self.proxies.clear();
        for (ticker, set) in proxies {
            self.proxies.insert(ticker, set);
        }
    }
}

fn parse(content: &str) -> Result<BTreeMap<String, FactorProxySet>, TraitError> {
    let file: ProxyFile =
        toml::from_str(content).map_err(|e| TraitError::ParseError(e.to_string()))?;
    Ok(file.proxies)
}

#[async_trait]
impl ProxySource for TomlProxySource {
    async fn get_factor_proxy_set(&self, ticker: &str) -> Result<FactorProxySet, TraitError> {
        self.proxies
            .get(ticker)
            .map(|set| set.clone())
            .ok_or_else(|| TraitError::ProxyNotConfigured(format!("no [proxies.{ticker}] table")))
    }
}
