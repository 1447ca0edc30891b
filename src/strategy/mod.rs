//! Strategy Layer - turns market snapshots into qualified candidates
//!
//! Evaluation chain, leaves first:
//! - `volatility`: ATR and volatility regime from recent bars
//! - `levels`: support/resistance clusters from orderbook depth
//! - `risk_geometry`: stop and targets placed off those levels
//! - `entry_qualifier`: threshold gates, quality score and priority tier
//! - `entry_confirmation`: per-symbol persistence filter on entries

pub mod entry_confirmation;
pub mod entry_qualifier;
pub mod levels;
pub mod params;
pub mod risk_geometry;
pub mod volatility;

pub use entry_confirmation::EntryConfirmation;
pub use entry_qualifier::{EntryQualifier, EntryRejection, QualityBreakdown};
pub use levels::{DetectedLevels, LevelDetector, LevelKind, PriceLevel};
pub use params::{
    EntryConfig, GeometryConfig, LevelConfig, ParamError, QualityWeights, TierBands,
    VolatilityConfig,
};
pub use risk_geometry::{GeometryError, LevelRiskCalculator, RiskGeometry};
pub use volatility::{VolatilityError, VolatilityEstimator, VolatilityProfile};
