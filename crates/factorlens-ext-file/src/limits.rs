//! TOML-backed risk limits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use factorlens_core::types::RiskLimitSet;
use factorlens_traits::{LimitSource, TraitError};

use crate::read_file;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LimitFile {
    #[serde(default)]
    scopes: BTreeMap<String, RiskLimitSet>,
}

/// Limit sets read from `[scopes.<id>]` tables.
///
/// ```toml
/// [scopes.default]
/// max_volatility = 0.20
/// max_single_stock_weight = 0.40
/// max_factor_share = 0.85
/// ```
///
/// Every scope is validated at load.
#[derive(Debug)]
pub struct TomlLimitSource {
    file_path: PathBuf,
    scopes: DashMap<String, RiskLimitSet>,
}

impl TomlLimitSource {
    /// Loads `file_path`.
    pub fn from_path(file_path: impl AsRef<Path>) -> Result<Self, TraitError> {
        let source = Self {
            file_path: file_path.as_ref().to_path_buf(),
            scopes: DashMap::new(),
        };
        source.reload()?;
        Ok(source)
    }

    /// Parses scope tables from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, TraitError> {
        let source = Self {
            file_path: PathBuf::new(),
            scopes: DashMap::new(),
        };
        source.replace(parse(content)?);
        Ok(source)
    }

    /// Re-reads the file, replacing every scope.
    pub fn reload(&self) -> Result<(), TraitError> {
        let content = read_file(&self.file_path)?;
        self.replace(parse(&content)?);
        debug!(
            path = %self.file_path.display(),
            scopes = self.scopes.len(),
            "limit scopes loaded"
        );
        Ok(())
    }

    /// Configured scope ids, sorted.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self.scopes.iter().map(|e| e.key().clone()).collect();
        scopes.sort();
        scopes
    }

    fn replace(&self, scopes: BTreeMap<String, RiskLimitSet>) {
        self.scopes.clear();
        for (scope, limits) in scopes {
            self.scopes.insert(scope, limits);
        }
    }
}

fn parse(content: &str) -> Result<BTreeMap<String, RiskLimitSet>, TraitError> {
    let file: LimitFile =
        toml::from_str(content).map_err(|e| TraitError::ParseError(e.to_string()))?;
    for (scope, limits) in &file.scopes {
        limits
            .validate()
            .map_err(|e| TraitError::InvalidInput(format!("scope {scope}: {e}")))?;
    }
    Ok(file.scopes)
}

#[async_trait]
impl LimitSource for TomlLimitSource {
    async fn get_risk_limits(&self, scope_id: &str) -> Result<RiskLimitSet, TraitError> {
        self.scopes
            .get(scope_id)
            .map(|limits| limits.clone())
            .ok_or_else(|| TraitError::NotFound(format!("limit scope {scope_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scope_lookup_with_alias() {
        let source = TomlLimitSource::from_toml_str(
            r#"
            [scopes.default]
            max_volatility = 0.20
            max_single_stock_weight = 0.40

            [scopes.aggressive]
            max_volatility = 0.35
            "#,
        )
        .unwrap();

        assert_eq!(source.scopes(), vec!["aggressive", "default"]);
        let limits = source.get_risk_limits("default").await.unwrap();
        assert_eq!(limits.max_volatility, Some(0.20));
        assert_eq!(limits.max_position_weight, Some(0.40));
        assert_eq!(limits.max_factor_share, None);
    }

    #[tokio::test]
    async fn test_unknown_scope() {
        let source = TomlLimitSource::from_toml_str("[scopes.default]\n").unwrap();
        let err = source.get_risk_limits("desk-7").await.unwrap_err();
        assert!(matches!(err, TraitError::NotFound(_)));
    }

    #[test]
    fn test_negative_limit_rejected_at_load() {
        let err = TomlLimitSource::from_toml_str("[scopes.default]\nmax_volatility = -0.1\n")
            .unwrap_err();
        assert!(matches!(err, TraitError::InvalidInput(ref m) if m.contains("default")));
    }

    #[test]
    fn test_unknown_limit_rejected() {
        assert!(matches!(
            TomlLimitSource::from_toml_str("[scopes.default]\nmax_leverage = 2.0\n"),
            Err(TraitError::ParseError(_))
        ));
    }
}
