//! Entry Qualifier
//!
//! Gates a snapshot against the entry thresholds and scores what passes.
//!
//! Score = Σ component × weight, each component normalized to [0, 1] by step
//! bands, capped at 100. Tier by score: ≥ high → HIGH, ≥ medium → MEDIUM,
//! ≥ low → LOW, otherwise rejected.

use thiserror::Error;

use crate::domain::{CandidateSignal, Direction, MarketSnapshot, PriorityTier};
use crate::strategy::params::EntryConfig;
use crate::strategy::risk_geometry::RiskGeometry;
use crate::strategy::volatility::VolatilityProfile;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EntryRejection {
    #[error("Weak imbalance: |{imbalance:.3}| < {threshold:.3}")]
    WeakImbalance { imbalance: f64, threshold: f64 },

    #[error("Insufficient trade flow: {count} large trades < {min}")]
    InsufficientTradeFlow { count: u32, min: u32 },

    #[error("Low volume: ratio {ratio:.2} < {min:.2}")]
    LowVolume { ratio: f64, min: f64 },

    #[error("Reward:risk {reward_risk:.2} < {min:.2}")]
    LowRewardRisk { reward_risk: f64, min: f64 },

    #[error("Stop distance {distance_pct:.2}% > {max_pct:.2}%")]
    StopTooWide { distance_pct: f64, max_pct: f64 },

    #[error("Geometry computed for {geometry} but imbalance points {imbalance}")]
    DirectionMismatch {
        imbalance: Direction,
        geometry: Direction,
    },

    #[error("Quality score {score:.1} below lowest tier {min:.1}")]
    LowQuality { score: f64, min: f64 },
}

/// Weighted contribution of each score component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityBreakdown {
    pub imbalance: f64,
    pub trade_flow: f64,
    pub volume: f64,
    pub reward_risk: f64,
    pub level_clarity: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct EntryQualifier {
    config: EntryConfig,
    max_stop_distance_pct: f64,
}

impl EntryQualifier {
    pub fn new(config: EntryConfig, max_stop_distance_pct: f64) -> Self {
        Self {
            config,
            max_stop_distance_pct,
        }
    }

    pub fn config(&self) -> &EntryConfig {
        &self.config
    }

    /// Direction implied by the snapshot if its imbalance clears the entry threshold
    pub fn direction_for(&self, snapshot: &MarketSnapshot) -> Result<Direction, EntryRejection> {
        let weak = EntryRejection::WeakImbalance {
            imbalance: snapshot.imbalance,
            threshold: self.config.imbalance_threshold,
        };
        if !snapshot.imbalance.is_finite() || snapshot.imbalance.abs() < self.config.imbalance_threshold {
            return Err(weak);
        }
        Direction::from_imbalance(snapshot.imbalance).ok_or(weak)
    }

    /// Full gate. Pure: the same inputs always produce the same outcome.
    pub fn qualify(
        &self,
        snapshot: &MarketSnapshot,
        volatility: &VolatilityProfile,
        geometry: &RiskGeometry,
        level_count: usize,
    ) -> Result<CandidateSignal, EntryRejection> {
        let direction = self.direction_for(snapshot)?;
        if direction != geometry.direction {
            return Err(EntryRejection::DirectionMismatch {
                imbalance: direction,
                geometry: geometry.direction,
            });
        }

        let flow = confirming_trades(snapshot, direction);
        if flow < self.config.min_trade_flow {
            return Err(EntryRejection::InsufficientTradeFlow {
                count: flow,
                min: self.config.min_trade_flow,
            });
        }

        let volume_ratio = snapshot.trade_flow.volume_ratio;
        if self.config.min_volume_ratio > 0.0 && volume_ratio < self.config.min_volume_ratio {
            return Err(EntryRejection::LowVolume {
                ratio: volume_ratio,
                min: self.config.min_volume_ratio,
            });
        }

        if geometry.reward_risk < self.config.min_reward_risk {
            return Err(EntryRejection::LowRewardRisk {
                reward_risk: geometry.reward_risk,
                min: self.config.min_reward_risk,
            });
        }

        if geometry.stop_distance_pct > self.max_stop_distance_pct {
            return Err(EntryRejection::StopTooWide {
                distance_pct: geometry.stop_distance_pct,
                max_pct: self.max_stop_distance_pct,
            });
        }

        let breakdown = self.score(snapshot.imbalance, flow, volume_ratio, geometry.reward_risk, level_count);
        let tier = self.tier_for(breakdown.total).ok_or(EntryRejection::LowQuality {
            score: breakdown.total,
            min: self.config.tiers.low,
        })?;

        Ok(CandidateSignal {
            symbol: snapshot.symbol.clone(),
            direction,
            created_at: snapshot.timestamp,
            entry_price: geometry.entry,
            stop_price: geometry.stop,
            tp1: geometry.tp1,
            tp2: geometry.tp2,
            reasons: geometry.reasons.clone(),
            reward_risk: geometry.reward_risk,
            quality_score: breakdown.total,
            tier,
            imbalance: snapshot.imbalance,
            atr: volatility.atr,
            regime: volatility.regime,
        })
    }

    pub fn score(
        &self,
        imbalance: f64,
        trade_flow: u32,
        volume_ratio: f64,
        reward_risk: f64,
        level_count: usize,
    ) -> QualityBreakdown {
        let w = &self.config.weights;
        let imbalance = imbalance_component(imbalance.abs()) * w.imbalance;
        let trade_flow = trade_flow_component(trade_flow) * w.trade_flow;
        let volume = volume_component(volume_ratio) * w.volume;
        let reward_risk = reward_risk_component(reward_risk) * w.reward_risk;
        let level_clarity = level_component(level_count) * w.level_clarity;
        let total = (imbalance + trade_flow + volume + reward_risk + level_clarity).min(100.0);

        QualityBreakdown {
            imbalance,
            trade_flow,
            volume,
            reward_risk,
            level_clarity,
            total,
        }
    }

    pub fn tier_for(&self, score: f64) -> Option<PriorityTier> {
        let bands = &self.config.tiers;
        if score >= bands.high {
            Some(PriorityTier::High)
        } else if score >= bands.medium {
            Some(PriorityTier::Medium)
        } else if score >= bands.low {
            Some(PriorityTier::Low)
        } else {
            None
        }
    }
}

/// Large trades on the side of `direction`
pub fn confirming_trades(snapshot: &MarketSnapshot, direction: Direction) -> u32 {
    match direction {
        Direction::Long => snapshot.trade_flow.large_buys,
        Direction::Short => snapshot.trade_flow.large_sells,
    }
}

fn imbalance_component(magnitude: f64) -> f64 {
    if magnitude >= 0.25 {
        1.0
    } else if magnitude >= 0.20 {
        0.8
    } else if magnitude >= 0.15 {
        0.5
    } else {
        (magnitude * 2.0).clamp(0.0, 0.5)
    }
}

fn trade_flow_component(count: u32) -> f64 {
    match count {
        5.. => 1.0,
        3..=4 => 0.75,
        2 => 0.5,
        n => f64::from(n) * 0.25,
    }
}

fn volume_component(ratio: f64) -> f64 {
    if ratio >= 3.0 {
        1.0
    } else if ratio >= 2.0 {
        0.75
    } else if ratio >= 1.5 {
        0.5
    } else {
        (ratio - 1.0).clamp(0.0, 0.5)
    }
}

fn reward_risk_component(rr: f64) -> f64 {
    if rr >= 2.0 {
        1.0
    } else if rr >= 1.5 {
        0.75
    } else if rr >= 1.0 {
        0.5
    } else if rr >= 0.8 {
        0.25
    } else {
        0.0
    }
}

fn level_component(count: usize) -> f64 {
    match count {
        0 => 0.0,
        1..=2 => 0.5,
        3..=4 => 0.7,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LevelReasons, TradeFlow, VolatilityRegime};
    use approx::assert_relative_eq;

    fn qualifier() -> EntryQualifier {
        EntryQualifier::new(EntryConfig::default(), 1.5)
    }

    fn snapshot(imbalance: f64, buys: u32, sells: u32, volume_ratio: f64) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::tick("SOLUSDT", 5_000, 100.0, imbalance);
        snapshot.trade_flow = TradeFlow {
            large_buys: buys,
            large_sells: sells,
            notional: 250_000.0,
            volume_ratio,
        };
        snapshot
    }

    fn volatility() -> VolatilityProfile {
        VolatilityProfile {
            atr: 0.2,
            atr_pct: 0.2,
            regime: VolatilityRegime::Low,
            reference_price: 100.0,
        }
    }

    fn long_geometry(reward_risk: f64) -> RiskGeometry {
        RiskGeometry {
            direction: Direction::Long,
            entry: 100.0,
            stop: 99.0,
            tp1: 100.0 + reward_risk,
            tp2: 100.0 + 2.0 * reward_risk,
            reward_risk,
            tp2_reward_risk: 2.0 * reward_risk,
            stop_distance: 1.0,
            stop_distance_pct: 1.0,
            reasons: LevelReasons {
                stop: "s".to_string(),
                tp1: "t1".to_string(),
                tp2: "t2".to_string(),
            },
        }
    }

    #[test]
    fn test_strong_setup_is_high_tier() {
        let candidate = qualifier()
            .qualify(&snapshot(0.40, 6, 0, 3.5), &volatility(), &long_geometry(2.0), 6)
            .unwrap();
        assert_eq!(candidate.direction, Direction::Long);
        assert_eq!(candidate.tier, PriorityTier::High);
        assert_relative_eq!(candidate.quality_score, 100.0);
        assert_eq!(candidate.created_at, 5_000);
        assert_eq!(candidate.regime, VolatilityRegime::Low);
        assert!(candidate.validate().is_ok());
    }

    #[test]
    fn test_tier_bands() {
        let q = qualifier();
        assert_eq!(q.tier_for(80.0), Some(PriorityTier::High));
        assert_eq!(q.tier_for(79.9), Some(PriorityTier::Medium));
        assert_eq!(q.tier_for(65.0), Some(PriorityTier::Medium));
        assert_eq!(q.tier_for(50.0), Some(PriorityTier::Low));
        assert_eq!(q.tier_for(49.9), None);
    }

    #[test]
    fn test_score_components() {
        // 30 × 0.8 + 20 × 0.75 + 20 × 0.5 + 20 × 0.5 + 10 × 0.7
        let breakdown = qualifier().score(-0.22, 3, 1.6, 1.2, 3);
        assert_relative_eq!(breakdown.total, 24.0 + 15.0 + 10.0 + 10.0 + 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_weak_imbalance_rejected() {
        let err = qualifier()
            .qualify(&snapshot(0.10, 6, 0, 3.0), &volatility(), &long_geometry(2.0), 4)
            .unwrap_err();
        assert!(matches!(err, EntryRejection::WeakImbalance { .. }));
    }

    #[test]
    fn test_trade_flow_counts_entry_side_only() {
        // plenty of sells, but the entry is long
        let err = qualifier()
            .qualify(&snapshot(0.40, 1, 9, 3.0), &volatility(), &long_geometry(2.0), 4)
            .unwrap_err();
        assert_eq!(err, EntryRejection::InsufficientTradeFlow { count: 1, min: 2 });
    }

    #[test]
    fn test_low_reward_risk_rejected() {
        let err = qualifier()
            .qualify(&snapshot(0.40, 6, 0, 3.0), &volatility(), &long_geometry(0.5), 4)
            .unwrap_err();
        assert!(matches!(err, EntryRejection::LowRewardRisk { .. }));
    }

    #[test]
    fn test_low_quality_rejected() {
        // 30 × 0.5 + 20 × 0.5 + 0 + 20 × 0.25 + 10 × 0.5 = 35
        let err = qualifier()
            .qualify(&snapshot(0.16, 2, 0, 1.0), &volatility(), &long_geometry(0.9), 1)
            .unwrap_err();
        assert!(matches!(err, EntryRejection::LowQuality { .. }));
    }

    #[test]
    fn test_direction_mismatch() {
        let err = qualifier()
            .qualify(&snapshot(-0.40, 0, 6, 3.0), &volatility(), &long_geometry(2.0), 4)
            .unwrap_err();
        assert!(matches!(err, EntryRejection::DirectionMismatch { .. }));
    }
}
