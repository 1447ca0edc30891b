use std::fmt;

use serde::{Deserialize, Serialize};

use super::market::{TimestampMs, VolatilityRegime};

/// Trade direction of a candidate or position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Direction implied by a signed imbalance; `None` when it is exactly flat
    pub fn from_imbalance(imbalance: f64) -> Option<Self> {
        if imbalance > 0.0 {
            Some(Direction::Long)
        } else if imbalance < 0.0 {
            Some(Direction::Short)
        } else {
            None
        }
    }

    /// +1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Imbalance pressure against this direction, as a non-negative magnitude.
    /// Pressure in favour of the direction yields 0.
    pub fn opposing_magnitude(&self, imbalance: f64) -> f64 {
        (-self.sign() * imbalance).max(0.0)
    }

    /// Percent move from `entry` to `exit`, positive when in favour
    pub fn return_pct(&self, entry: f64, exit: f64) -> f64 {
        self.sign() * (exit - entry) / entry * 100.0
    }

    /// True when `price` is at or past `level` on the adverse side
    pub fn is_adverse_cross(&self, price: f64, level: f64) -> bool {
        match self {
            Direction::Long => price <= level,
            Direction::Short => price >= level,
        }
    }

    /// True when `price` is at or past `level` on the favourable side
    pub fn is_favourable_cross(&self, price: f64, level: f64) -> bool {
        match self {
            Direction::Long => price >= level,
            Direction::Short => price <= level,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Coarse quality class governing daily caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 3] = [PriorityTier::High, PriorityTier::Medium, PriorityTier::Low];
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityTier::High => write!(f, "HIGH"),
            PriorityTier::Medium => write!(f, "MEDIUM"),
            PriorityTier::Low => write!(f, "LOW"),
        }
    }
}

/// Human-readable justification for each placed level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReasons {
    pub stop: String,
    pub tp1: String,
    pub tp2: String,
}

/// A qualified opportunity awaiting admission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSignal {
    pub symbol: String,
    pub direction: Direction,
    /// Timestamp of the snapshot that produced the candidate
    pub created_at: TimestampMs,
    pub entry_price: f64,
    pub stop_price: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub reasons: LevelReasons,
    pub reward_risk: f64,
    /// Composite quality, 0-100
    pub quality_score: f64,
    pub tier: PriorityTier,
    pub imbalance: f64,
    pub atr: f64,
    pub regime: VolatilityRegime,
}

impl CandidateSignal {
    /// Checks the level ordering: stop < entry < tp1 < tp2 for longs, mirrored for shorts
    pub fn validate(&self) -> Result<(), String> {
        let levels = [self.stop_price, self.entry_price, self.tp1, self.tp2];
        if levels.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(format!("Non-positive or non-finite level in {:?}", levels));
        }

        let ordered = match self.direction {
            Direction::Long => {
                self.stop_price < self.entry_price
                    && self.entry_price < self.tp1
                    && self.tp1 < self.tp2
            }
            Direction::Short => {
                self.stop_price > self.entry_price
                    && self.entry_price > self.tp1
                    && self.tp1 > self.tp2
            }
        };

        if !ordered {
            return Err(format!(
                "Invalid {} level ordering: stop={} entry={} tp1={} tp2={}",
                self.direction, self.stop_price, self.entry_price, self.tp1, self.tp2
            ));
        }

        if self.quality_score.is_nan() || !(0.0..=100.0).contains(&self.quality_score) {
            return Err(format!("Invalid quality score: {}", self.quality_score));
        }

        Ok(())
    }

    /// Stop distance as percent of entry
    pub fn stop_distance_pct(&self) -> f64 {
        (self.entry_price - self.stop_price).abs() / self.entry_price * 100.0
    }
}
