//! Factor identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RiskError;

/// The systematic return driver a factor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    /// Broad market.
    Market,
    /// Momentum style.
    Momentum,
    /// Value style.
    Value,
    /// Industry.
    Industry,
    /// Peer group of the holding.
    SubIndustry,
}

impl FactorKind {
    /// All kinds, in canonical order.
    pub const ALL: [FactorKind; 5] = [
        FactorKind::Market,
        FactorKind::Momentum,
        FactorKind::Value,
        FactorKind::Industry,
        FactorKind::SubIndustry,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::Market => "market",
            FactorKind::Momentum => "momentum",
            FactorKind::Value => "value",
            FactorKind::Industry => "industry",
            FactorKind::SubIndustry => "sub_industry",
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactorKind {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FactorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| RiskError::configuration(format!("unknown factor kind '{s}'")))
    }
}

/// A factor: its kind plus the proxy label it is measured by.
///
/// Market, style and industry factors are labelled with their proxy ticker
/// and shared by every holding using that proxy. Sub-industry factors are
/// labelled with the holding's own ticker since each holding has its own
/// peer basket.
///
/// Serializes as `"kind:label"` so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FactorId {
    kind: FactorKind,
    label: String,
}

impl FactorId {
    /// Creates a factor id.
    pub fn new(kind: FactorKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }

    /// Market factor measured by `proxy`.
    pub fn market(proxy: impl Into<String>) -> Self {
        Self::new(FactorKind::Market, proxy)
    }

    /// Momentum factor measured by `proxy`.
    pub fn momentum(proxy: impl Into<String>) -> Self {
        Self::new(FactorKind::Momentum, proxy)
    }

    /// Value factor measured by `proxy`.
    pub fn value(proxy: impl Into<String>) -> Self {
        Self::new(FactorKind::Value, proxy)
    }

    /// Industry factor measured by `proxy`.
    pub fn industry(proxy: impl Into<String>) -> Self {
        Self::new(FactorKind::Industry, proxy)
    }

    /// Peer-group factor of `holding`.
    pub fn sub_industry(holding: impl Into<String>) -> Self {
        Self::new(FactorKind::SubIndustry, holding)
    }

    /// The factor kind.
    pub fn kind(&self) -> FactorKind {
        self.kind
    }

    /// The proxy label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for FactorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.label)
    }
}

impl FromStr for FactorId {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, label) = s
            .split_once(':')
            .ok_or_else(|| RiskError::configuration(format!("malformed factor id '{s}'")))?;
        if label.is_empty() {
            return Err(RiskError::configuration(format!(
                "factor id '{s}' has an empty label"
            )));
        }
        Ok(Self::new(kind.parse()?, label))
    }
}

impl TryFrom<String> for FactorId {
    type Error = RiskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FactorId> for String {
    fn from(id: FactorId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_display_and_parse() {
        let id = FactorId::sub_industry("AAPL");
        assert_eq!(id.to_string(), "sub_industry:AAPL");
        assert_eq!("sub_industry:AAPL".parse::<FactorId>().unwrap(), id);
        assert!("sector:XLK".parse::<FactorId>().is_err());
        assert!("market".parse::<FactorId>().is_err());
    }

    #[test]
    fn test_ordering_by_kind_then_label() {
        let mut ids = vec![
            FactorId::industry("XLK"),
            FactorId::market("SPY"),
            FactorId::momentum("MTUM"),
            FactorId::market("IWM"),
        ];
        ids.sort();
        assert_eq!(ids[0], FactorId::market("IWM"));
        assert_eq!(ids[1], FactorId::market("SPY"));
        assert_eq!(ids[3], FactorId::industry("XLK"));
    }

    #[test]
    fn test_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(FactorId::market("SPY"), 1.1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"market:SPY":1.1}"#);
        let back: BTreeMap<FactorId, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
