//! Level-Based Risk Calculator
//!
//! LONG:  stop = far edge of nearest support − k × ATR
//!        tp1  = nearest resistance, tp2 = second resistance
//! SHORT: mirrored.
//!
//! A candidate without a defensible geometry is rejected; levels are never
//! synthesized when the book has none.

use thiserror::Error;

use crate::domain::{Direction, LevelReasons};
use crate::strategy::levels::{DetectedLevels, LevelKind, PriceLevel};
use crate::strategy::params::GeometryConfig;
use crate::strategy::volatility::VolatilityProfile;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    #[error("No {0} level to protect a {1} stop")]
    NoStopLevel(LevelKind, Direction),

    #[error("No {0} level to target for {1}")]
    NoTargetLevel(LevelKind, Direction),

    #[error("No stop buffer beyond the cluster edge: {multiplier}×ATR {atr}")]
    NoStopBuffer { multiplier: f64, atr: f64 },

    #[error("Non-positive risk: entry {entry} stop {stop}")]
    NonPositiveRisk { entry: f64, stop: f64 },

    #[error("Stop too wide: {distance_pct:.2}% > {max_pct:.2}%")]
    StopTooWide { distance_pct: f64, max_pct: f64 },

    #[error("Target too close: {distance_pct:.2}% < {min_pct:.2}%")]
    TargetTooClose { distance_pct: f64, min_pct: f64 },

    #[error("Invalid level ordering: {0}")]
    InvalidOrdering(String),
}

/// Stop, targets and reward:risk for one direction
#[derive(Debug, Clone, PartialEq)]
pub struct RiskGeometry {
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub tp1: f64,
    pub tp2: f64,
    /// (tp1 − entry) / (entry − stop), sign-adjusted
    pub reward_risk: f64,
    pub tp2_reward_risk: f64,
    pub stop_distance: f64,
    pub stop_distance_pct: f64,
    pub reasons: LevelReasons,
}

#[derive(Debug, Clone)]
pub struct LevelRiskCalculator {
    config: GeometryConfig,
}

impl LevelRiskCalculator {
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    pub fn compute(
        &self,
        direction: Direction,
        entry: f64,
        levels: &DetectedLevels,
        volatility: &VolatilityProfile,
    ) -> Result<RiskGeometry, GeometryError> {
        let (stop_kind, target_kind) = match direction {
            Direction::Long => (LevelKind::Support, LevelKind::Resistance),
            Direction::Short => (LevelKind::Resistance, LevelKind::Support),
        };
        let sign = direction.sign();

        let protect = levels
            .of_kind(stop_kind)
            .first()
            .ok_or(GeometryError::NoStopLevel(stop_kind, direction))?;
        let targets = levels.of_kind(target_kind);
        let first_target = targets
            .first()
            .ok_or(GeometryError::NoTargetLevel(target_kind, direction))?;

        // the stop must sit strictly outside the protecting cluster
        let buffer = self.config.atr_multiplier * volatility.atr;
        if !(buffer > 0.0) {
            return Err(GeometryError::NoStopBuffer {
                multiplier: self.config.atr_multiplier,
                atr: volatility.atr,
            });
        }
        let stop = protect.far_edge() - sign * buffer;
        let stop_distance = sign * (entry - stop);
        if stop_distance <= 0.0 || stop <= 0.0 {
            return Err(GeometryError::NonPositiveRisk { entry, stop });
        }

        let stop_distance_pct = stop_distance / entry * 100.0;
        if stop_distance_pct > self.config.max_stop_distance_pct {
            return Err(GeometryError::StopTooWide {
                distance_pct: stop_distance_pct,
                max_pct: self.config.max_stop_distance_pct,
            });
        }

        let tp1 = first_target.price;
        let reward = sign * (tp1 - entry);
        if reward <= 0.0 {
            return Err(GeometryError::InvalidOrdering(format!(
                "tp1 {} is not beyond entry {} for {}",
                tp1, entry, direction
            )));
        }
        let tp1_distance_pct = reward / entry * 100.0;
        if tp1_distance_pct < self.config.min_tp_distance_pct {
            return Err(GeometryError::TargetTooClose {
                distance_pct: tp1_distance_pct,
                min_pct: self.config.min_tp_distance_pct,
            });
        }

        let (tp2, tp2_reason) = match targets.get(1) {
            Some(second) => (second.price, describe_target(second, "second")),
            None => (
                entry + self.config.tp2_extension * (tp1 - entry),
                format!("extended from tp1 ({}×)", self.config.tp2_extension),
            ),
        };
        if sign * (tp2 - tp1) <= 0.0 || tp2 <= 0.0 {
            return Err(GeometryError::InvalidOrdering(format!(
                "tp2 {} is not beyond tp1 {} for {}",
                tp2, tp1, direction
            )));
        }

        let reasons = LevelReasons {
            stop: format!(
                "{}×ATR ({:.6}) {} {} cluster {:.6}-{:.6} (strength {:.0})",
                self.config.atr_multiplier,
                buffer,
                if direction == Direction::Long { "below" } else { "above" },
                protect.kind,
                protect.low,
                protect.high,
                protect.strength
            ),
            tp1: describe_target(first_target, "nearest"),
            tp2: tp2_reason,
        };

        Ok(RiskGeometry {
            direction,
            entry,
            stop,
            tp1,
            tp2,
            reward_risk: reward / stop_distance,
            tp2_reward_risk: sign * (tp2 - entry) / stop_distance,
            stop_distance,
            stop_distance_pct,
            reasons,
        })
    }
}

fn describe_target(level: &PriceLevel, which: &str) -> String {
    format!(
        "{} {} at {:.6} (strength {:.0}, {} points)",
        which, level.kind, level.price, level.strength, level.points
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VolatilityRegime;
    use approx::assert_relative_eq;

    fn level(price: f64, kind: LevelKind) -> PriceLevel {
        PriceLevel {
            price,
            strength: 50_000.0,
            kind,
            low: price - 0.05,
            high: price + 0.05,
            points: 3,
        }
    }

    fn volatility(atr: f64) -> VolatilityProfile {
        VolatilityProfile {
            atr,
            atr_pct: atr,
            regime: VolatilityRegime::Medium,
            reference_price: 100.0,
        }
    }

    fn book() -> DetectedLevels {
        DetectedLevels {
            supports: vec![level(99.5, LevelKind::Support), level(98.0, LevelKind::Support)],
            resistances: vec![
                level(101.0, LevelKind::Resistance),
                level(102.0, LevelKind::Resistance),
            ],
        }
    }

    #[test]
    fn test_long_geometry() {
        let calc = LevelRiskCalculator::new(GeometryConfig::default());
        let geometry = calc.compute(Direction::Long, 100.0, &book(), &volatility(0.2)).unwrap();

        // far edge 99.45 − 1.5 × 0.2
        assert_relative_eq!(geometry.stop, 99.15, epsilon = 1e-9);
        assert_relative_eq!(geometry.tp1, 101.0);
        assert_relative_eq!(geometry.tp2, 102.0);
        assert_relative_eq!(geometry.reward_risk, 1.0 / 0.85, epsilon = 1e-9);
        assert_relative_eq!(geometry.stop_distance_pct, 0.85, epsilon = 1e-9);
        assert!(geometry.stop < geometry.entry && geometry.tp1 < geometry.tp2);
        assert!(geometry.reasons.stop.contains("below support"));
    }

    #[test]
    fn test_short_geometry_mirrors() {
        let calc = LevelRiskCalculator::new(GeometryConfig::default());
        let geometry = calc.compute(Direction::Short, 100.0, &book(), &volatility(0.2)).unwrap();

        assert_relative_eq!(geometry.stop, 101.05 + 0.3, epsilon = 1e-9);
        assert_relative_eq!(geometry.tp1, 99.5);
        assert_relative_eq!(geometry.tp2, 98.0);
        assert!(geometry.stop > geometry.entry && geometry.tp1 > geometry.tp2);
    }

    #[test]
    fn test_tp2_extended_with_single_target() {
        let calc = LevelRiskCalculator::new(GeometryConfig::default());
        let mut levels = book();
        levels.resistances.truncate(1);
        let geometry = calc.compute(Direction::Long, 100.0, &levels, &volatility(0.2)).unwrap();
        assert_relative_eq!(geometry.tp2, 101.5, epsilon = 1e-9);
        assert!(geometry.reasons.tp2.starts_with("extended from tp1"));
    }

    #[test]
    fn test_missing_levels_fail() {
        let calc = LevelRiskCalculator::new(GeometryConfig::default());
        let empty = DetectedLevels::default();
        assert!(matches!(
            calc.compute(Direction::Long, 100.0, &empty, &volatility(0.2)),
            Err(GeometryError::NoStopLevel(LevelKind::Support, Direction::Long))
        ));

        let mut no_targets = book();
        no_targets.resistances.clear();
        assert!(matches!(
            calc.compute(Direction::Long, 100.0, &no_targets, &volatility(0.2)),
            Err(GeometryError::NoTargetLevel(LevelKind::Resistance, _))
        ));
    }

    #[test]
    fn test_flat_atr_has_no_stop_buffer() {
        let calc = LevelRiskCalculator::new(GeometryConfig::default());
        let result = calc.compute(Direction::Long, 100.0, &book(), &volatility(0.0));
        assert_eq!(
            result.unwrap_err(),
            GeometryError::NoStopBuffer {
                multiplier: 1.5,
                atr: 0.0
            }
        );

        let short = calc.compute(Direction::Short, 100.0, &book(), &volatility(0.0));
        assert!(matches!(short, Err(GeometryError::NoStopBuffer { .. })));
    }

    #[test]
    fn test_stop_outside_protecting_cluster() {
        let calc = LevelRiskCalculator::new(GeometryConfig::default());
        let levels = book();
        let long = calc.compute(Direction::Long, 100.0, &levels, &volatility(0.01)).unwrap();
        assert!(long.stop < levels.supports[0].low);
        let short = calc.compute(Direction::Short, 100.0, &levels, &volatility(0.01)).unwrap();
        assert!(short.stop > levels.resistances[0].high);
    }

    #[test]
    fn test_stop_too_wide() {
        let calc = LevelRiskCalculator::new(GeometryConfig::default());
        let result = calc.compute(Direction::Long, 100.0, &book(), &volatility(1.0));
        assert!(matches!(result, Err(GeometryError::StopTooWide { .. })));
    }

    #[test]
    fn test_target_too_close() {
        let calc = LevelRiskCalculator::new(GeometryConfig::default());
        let mut levels = book();
        levels.resistances[0] = level(100.1, LevelKind::Resistance);
        let result = calc.compute(Direction::Long, 100.0, &levels, &volatility(0.2));
        assert!(matches!(result, Err(GeometryError::TargetTooClose { .. })));
    }
}
