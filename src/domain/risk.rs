//! Portfolio admission gate
//!
//! Every qualified candidate passes through `RiskManager::admit` exactly once.
//! Checks run in a fixed order: duplicate symbol, daily tier cap, concurrent
//! cap, correlation. Day boundaries are UTC calendar days of the candidate
//! timestamp.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::market::TimestampMs;
use super::signal::{CandidateSignal, Direction, PriorityTier};

/// Which open positions count against a candidate in the correlation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationScope {
    SameDirection,
    AnyDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationOverride {
    pub a: String,
    pub b: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierCaps {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl Default for TierCaps {
    fn default() -> Self {
        Self {
            high: 20,
            medium: 40,
            low: 20,
        }
    }
}

impl TierCaps {
    pub fn get(&self, tier: PriorityTier) -> u32 {
        match tier {
            PriorityTier::High => self.high,
            PriorityTier::Medium => self.medium,
            PriorityTier::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    pub daily_caps: TierCaps,
    pub max_concurrent: usize,
    pub correlation_threshold: f64,
    pub correlation_scope: CorrelationScope,
    /// Stripped from symbols to get the base asset
    pub quote_suffix: String,
    pub majors: Vec<String>,
    pub overrides: Vec<CorrelationOverride>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            daily_caps: TierCaps::default(),
            max_concurrent: 10,
            correlation_threshold: 0.6,
            correlation_scope: CorrelationScope::SameDirection,
            quote_suffix: "USDT".to_string(),
            majors: vec!["BTC".to_string(), "ETH".to_string(), "BNB".to_string()],
            overrides: Vec::new(),
        }
    }
}

impl AdmissionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(format!(
                "correlation_threshold {} must be in [0, 1]",
                self.correlation_threshold
            ));
        }
        if let Some(o) = self.overrides.iter().find(|o| !(0.0..=1.0).contains(&o.value)) {
            return Err(format!(
                "correlation override {}/{} value {} must be in [0, 1]",
                o.a, o.b, o.value
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdmissionRejection {
    #[error("{0} already has an open position")]
    DuplicateSymbol(String),

    #[error("Daily {tier} cap reached ({count}/{cap})")]
    DailyCapReached {
        tier: PriorityTier,
        count: u32,
        cap: u32,
    },

    #[error("Concurrent position cap reached ({open}/{cap})")]
    ConcurrentCapReached { open: usize, cap: usize },

    #[error("{symbol} correlates {value:.2} with open {other} (threshold {threshold:.2})")]
    Correlated {
        symbol: String,
        other: String,
        value: f64,
        threshold: f64,
    },
}

/// Proof of admission. Not clonable; consumed when the position opens.
#[derive(Debug)]
pub struct AdmissionToken {
    symbol: String,
    tier: PriorityTier,
    admitted_at: TimestampMs,
}

impl AdmissionToken {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn tier(&self) -> PriorityTier {
        self.tier
    }

    pub fn admitted_at(&self) -> TimestampMs {
        self.admitted_at
    }

    #[cfg(test)]
    pub(crate) fn for_tests(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            tier: PriorityTier::High,
            admitted_at: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenSlot {
    direction: Direction,
    tier: PriorityTier,
}

/// Snapshot of today's admission counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub day: Option<NaiveDate>,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub open_positions: usize,
    pub caps: TierCaps,
    pub max_concurrent: usize,
}

#[derive(Debug)]
pub struct RiskManager {
    config: AdmissionConfig,
    open: HashMap<String, OpenSlot>,
    daily_counts: HashMap<PriorityTier, u32>,
    day: Option<NaiveDate>,
}

impl RiskManager {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            open: HashMap::new(),
            daily_counts: HashMap::new(),
            day: None,
        }
    }

    /// Admit or reject a candidate. On success the symbol is recorded as open
    /// and today's tier count is incremented.
    pub fn admit(&mut self, candidate: &CandidateSignal) -> Result<AdmissionToken, AdmissionRejection> {
        self.check_day_rollover(candidate.created_at);

        if let Err(rejection) = self.check(candidate) {
            debug!("{}: admission rejected: {}", candidate.symbol, rejection);
            return Err(rejection);
        }

        self.open.insert(
            candidate.symbol.clone(),
            OpenSlot {
                direction: candidate.direction,
                tier: candidate.tier,
            },
        );
        *self.daily_counts.entry(candidate.tier).or_insert(0) += 1;

        info!(
            "{}: admitted {} {} ({} open, {} {} today)",
            candidate.symbol,
            candidate.tier,
            candidate.direction,
            self.open.len(),
            self.count_today(candidate.tier),
            candidate.tier
        );

        Ok(AdmissionToken {
            symbol: candidate.symbol.clone(),
            tier: candidate.tier,
            admitted_at: candidate.created_at,
        })
    }

    fn check(&self, candidate: &CandidateSignal) -> Result<(), AdmissionRejection> {
        if self.open.contains_key(&candidate.symbol) {
            return Err(AdmissionRejection::DuplicateSymbol(candidate.symbol.clone()));
        }

        let count = self.count_today(candidate.tier);
        let cap = self.config.daily_caps.get(candidate.tier);
        if count >= cap {
            return Err(AdmissionRejection::DailyCapReached {
                tier: candidate.tier,
                count,
                cap,
            });
        }

        if self.open.len() >= self.config.max_concurrent {
            return Err(AdmissionRejection::ConcurrentCapReached {
                open: self.open.len(),
                cap: self.config.max_concurrent,
            });
        }

        for (other, slot) in &self.open {
            if self.config.correlation_scope == CorrelationScope::SameDirection
                && slot.direction != candidate.direction
            {
                continue;
            }
            let value = self.correlation(&candidate.symbol, other);
            if value > self.config.correlation_threshold {
                return Err(AdmissionRejection::Correlated {
                    symbol: candidate.symbol.clone(),
                    other: other.clone(),
                    value,
                    threshold: self.config.correlation_threshold,
                });
            }
        }

        Ok(())
    }

    /// Free the symbol's slot once its position has closed
    pub fn release(&mut self, symbol: &str) -> bool {
        match self.open.remove(symbol) {
            Some(slot) => {
                debug!("{}: released {} slot ({} open)", symbol, slot.tier, self.open.len());
                true
            }
            None => false,
        }
    }

    /// Static correlation estimate between two symbols
    pub fn correlation(&self, a: &str, b: &str) -> f64 {
        if let Some(o) = self
            .config
            .overrides
            .iter()
            .find(|o| (o.a == a && o.b == b) || (o.a == b && o.b == a))
        {
            return o.value;
        }

        let base_a = self.base_asset(a);
        let base_b = self.base_asset(b);
        if base_a == base_b {
            return 1.0;
        }

        let is_major = |base: &str| self.config.majors.iter().any(|m| m == base);
        match (is_major(base_a), is_major(base_b)) {
            (true, true) => 0.7,
            (true, false) | (false, true) => 0.3,
            (false, false) => 0.1,
        }
    }

    fn base_asset<'a>(&self, symbol: &'a str) -> &'a str {
        symbol
            .strip_suffix(self.config.quote_suffix.as_str())
            .filter(|base| !base.is_empty())
            .unwrap_or(symbol)
    }

    fn check_day_rollover(&mut self, timestamp: TimestampMs) {
        let Some(day) = DateTime::<Utc>::from_timestamp_millis(timestamp as i64).map(|t| t.date_naive())
        else {
            return;
        };
        if self.day != Some(day) {
            if self.day.is_some() {
                info!("New trading day {}, daily tier counters reset", day);
            }
            self.day = Some(day);
            self.daily_counts.clear();
        }
    }

    fn count_today(&self, tier: PriorityTier) -> u32 {
        self.daily_counts.get(&tier).copied().unwrap_or(0)
    }

    pub fn is_open(&self, symbol: &str) -> bool {
        self.open.contains_key(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn daily_stats(&self) -> DailyStats {
        DailyStats {
            day: self.day,
            high: self.count_today(PriorityTier::High),
            medium: self.count_today(PriorityTier::Medium),
            low: self.count_today(PriorityTier::Low),
            open_positions: self.open.len(),
            caps: self.config.daily_caps,
            max_concurrent: self.config.max_concurrent,
        }
    }
}
