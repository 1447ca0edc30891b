//! Strategy parameters
//!
//! Immutable settings for the evaluation pipeline. Every struct deserializes
//! with per-field defaults so a partial TOML section is valid.

use serde::{Deserialize, Serialize};

/// ATR estimation and regime banding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Number of true ranges averaged into the ATR
    pub atr_period: usize,
    /// ATR% below this is a LOW regime
    pub low_band_pct: f64,
    /// ATR% below this (and above the low band) is MEDIUM, otherwise HIGH
    pub high_band_pct: f64,
    /// Working range half-width in ATRs
    pub working_range_atr_multiplier: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            low_band_pct: 0.3,
            high_band_pct: 0.7,
            working_range_atr_multiplier: 3.0,
        }
    }
}

impl VolatilityConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.atr_period < 2 {
            return Err(ParamError::InvalidAtrPeriod(self.atr_period));
        }
        if self.low_band_pct <= 0.0 || self.high_band_pct <= self.low_band_pct {
            return Err(ParamError::InvalidRegimeBands(self.low_band_pct, self.high_band_pct));
        }
        if self.working_range_atr_multiplier <= 0.0 {
            return Err(ParamError::NonPositive("working_range_atr_multiplier", self.working_range_atr_multiplier));
        }
        Ok(())
    }
}

/// Orderbook clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Max gap between adjacent points of one cluster, percent of price
    pub cluster_distance_pct: f64,
    /// Absolute strength floor in quote notional
    pub min_cluster_notional: f64,
    /// Strength floor relative to the strongest cluster (0-1)
    pub min_relative_strength: f64,
    pub max_levels_per_side: usize,
    /// Restrict clustering to the volatility working range
    pub use_working_range: bool,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            cluster_distance_pct: 0.2,
            min_cluster_notional: 10_000.0,
            min_relative_strength: 0.1,
            max_levels_per_side: 5,
            use_working_range: true,
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.cluster_distance_pct <= 0.0 || self.cluster_distance_pct > 5.0 {
            return Err(ParamError::InvalidClusterDistance(self.cluster_distance_pct));
        }
        if self.min_cluster_notional < 0.0 {
            return Err(ParamError::NonPositive("min_cluster_notional", self.min_cluster_notional));
        }
        if !(0.0..=1.0).contains(&self.min_relative_strength) {
            return Err(ParamError::OutOfUnitRange("min_relative_strength", self.min_relative_strength));
        }
        if self.max_levels_per_side == 0 {
            return Err(ParamError::NonPositive("max_levels_per_side", 0.0));
        }
        Ok(())
    }
}

/// Stop and target placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Stop buffer beyond the protecting cluster, in ATRs
    pub atr_multiplier: f64,
    /// Hard bound on stop distance, percent of entry
    pub max_stop_distance_pct: f64,
    /// Minimum tp1 distance, percent of entry
    pub min_tp_distance_pct: f64,
    /// tp2 = entry + extension × (tp1 − entry) when only one target level exists
    pub tp2_extension: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            atr_multiplier: 1.5,
            max_stop_distance_pct: 1.5,
            min_tp_distance_pct: 0.2,
            tp2_extension: 1.5,
        }
    }
}

impl GeometryConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.atr_multiplier > 0.0) {
            return Err(ParamError::NonPositive("atr_multiplier", self.atr_multiplier));
        }
        if self.max_stop_distance_pct <= 0.0 || self.max_stop_distance_pct > 50.0 {
            return Err(ParamError::InvalidStopDistance(self.max_stop_distance_pct));
        }
        if self.min_tp_distance_pct < 0.0 {
            return Err(ParamError::NonPositive("min_tp_distance_pct", self.min_tp_distance_pct));
        }
        if self.tp2_extension <= 1.0 {
            return Err(ParamError::InvalidExtension(self.tp2_extension));
        }
        Ok(())
    }
}

/// Weights of the quality score components. They should sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub imbalance: f64,
    pub trade_flow: f64,
    pub volume: f64,
    pub reward_risk: f64,
    pub level_clarity: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            imbalance: 30.0,
            trade_flow: 20.0,
            volume: 20.0,
            reward_risk: 20.0,
            level_clarity: 10.0,
        }
    }
}

impl QualityWeights {
    pub fn total(&self) -> f64 {
        self.imbalance + self.trade_flow + self.volume + self.reward_risk + self.level_clarity
    }
}

/// Minimum score per priority tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBands {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for TierBands {
    fn default() -> Self {
        Self {
            high: 80.0,
            medium: 65.0,
            low: 50.0,
        }
    }
}

/// Entry gating and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// Minimum |imbalance| to consider an entry
    pub imbalance_threshold: f64,
    /// Minimum large trades on the entry side
    pub min_trade_flow: u32,
    pub min_reward_risk: f64,
    /// Volume ratio floor; 0 disables the check
    pub min_volume_ratio: f64,
    pub weights: QualityWeights,
    pub tiers: TierBands,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            imbalance_threshold: 0.15,
            min_trade_flow: 2,
            min_reward_risk: 0.8,
            min_volume_ratio: 0.0,
            weights: QualityWeights::default(),
            tiers: TierBands::default(),
        }
    }
}

impl EntryConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.imbalance_threshold <= 0.0 || self.imbalance_threshold > 1.0 {
            return Err(ParamError::OutOfUnitRange("imbalance_threshold", self.imbalance_threshold));
        }
        if self.min_reward_risk <= 0.0 {
            return Err(ParamError::NonPositive("min_reward_risk", self.min_reward_risk));
        }
        if self.min_volume_ratio < 0.0 {
            return Err(ParamError::NonPositive("min_volume_ratio", self.min_volume_ratio));
        }
        let total = self.weights.total();
        if (total - 100.0).abs() > 1e-6 {
            return Err(ParamError::InvalidWeights(total));
        }
        let t = &self.tiers;
        if !(t.high > t.medium && t.medium > t.low && t.low > 0.0 && t.high <= 100.0) {
            return Err(ParamError::InvalidTierBands(t.high, t.medium, t.low));
        }
        Ok(())
    }
}

/// Parameter validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParamError {
    #[error("Invalid ATR period: {0} (minimum 2)")]
    InvalidAtrPeriod(usize),
    #[error("Invalid regime bands: low {0}% high {1}% (need 0 < low < high)")]
    InvalidRegimeBands(f64, f64),
    #[error("Invalid cluster distance: {0}% (must be 0 < d <= 5)")]
    InvalidClusterDistance(f64),
    #[error("Invalid max stop distance: {0}% (must be 0 < d <= 50)")]
    InvalidStopDistance(f64),
    #[error("Invalid tp2 extension: {0} (must be > 1)")]
    InvalidExtension(f64),
    #[error("Quality weights sum to {0}, expected 100")]
    InvalidWeights(f64),
    #[error("Tier bands must descend within (0, 100]: high {0} medium {1} low {2}")]
    InvalidTierBands(f64, f64, f64),
    #[error("{0} must be positive, got {1}")]
    NonPositive(&'static str, f64),
    #[error("{0} must be within [0, 1], got {1}")]
    OutOfUnitRange(&'static str, f64),
}
