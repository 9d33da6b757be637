//! Domain types for factor risk analysis.
//!
//! - [`Holding`]: a signed position weight
//! - [`ReturnSeries`]: validated, ordered period returns
//! - [`FactorProxySet`]: proxy tickers for each factor of a holding
//! - [`FactorId`]: a factor kind plus its proxy label
//! - [`AssetFactorModel`]: fitted betas and idiosyncratic variance
//! - [`FactorCovariance`]: factor return covariance
//! - [`RiskLimitSet`]: declarative risk thresholds

mod covariance;
mod factor;
mod frequency;
mod holding;
mod limits;
mod model;
mod proxy;
mod series;
mod window;

pub use covariance::FactorCovariance;
pub use factor::{FactorId, FactorKind};
pub use frequency::Frequency;
pub use holding::{validate_holdings, Holding};
pub use limits::{LimitMetric, RiskLimitSet};
pub use model::{AssetFactorModel, FitDiagnostics};
pub use proxy::FactorProxySet;
pub use series::{inner_join, AlignedReturns, ReturnPoint, ReturnSeries};
pub use window::AnalysisWindow;
