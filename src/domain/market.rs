//! Market observations consumed by the engine.
//!
//! A `MarketSnapshot` is produced by the market-data collaborator at a fixed
//! cadence per symbol and is never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Milliseconds. Snapshot timestamps and clock readings share this unit.
pub type TimestampMs = u64;

/// Volatility bucket derived from ATR as a percent of price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityRegime {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolatilityRegime::Low => write!(f, "LOW"),
            VolatilityRegime::Medium => write!(f, "MEDIUM"),
            VolatilityRegime::High => write!(f, "HIGH"),
        }
    }
}

/// OHLCV bar used for volatility estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl PriceBar {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self { open, high, low, close, volume }
    }

    /// Validate OHLC data integrity
    pub fn is_valid(&self) -> bool {
        self.high.is_finite()
            && self.low.is_finite()
            && self.open.is_finite()
            && self.close.is_finite()
            && self.high >= self.low
            && self.close >= self.low
            && self.close <= self.high
            && self.open >= self.low
            && self.open <= self.high
    }
}

/// Resting orderbook liquidity as (price, size) pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookDepth {
    #[serde(default)]
    pub bids: Vec<(f64, f64)>,
    #[serde(default)]
    pub asks: Vec<(f64, f64)>,
}

impl OrderBookDepth {
    pub fn new(bids: Vec<(f64, f64)>, asks: Vec<(f64, f64)>) -> Self {
        Self { bids, asks }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Every price point on both sides, skipping non-positive or non-finite entries
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .copied()
            .filter(|(price, size)| {
                price.is_finite() && size.is_finite() && *price > 0.0 && *size > 0.0
            })
    }
}

/// Large-trade flow over the rolling window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeFlow {
    /// Large aggressive buys in the window
    #[serde(default)]
    pub large_buys: u32,
    /// Large aggressive sells in the window
    #[serde(default)]
    pub large_sells: u32,
    /// Total traded notional in the window
    #[serde(default)]
    pub notional: f64,
    /// Window volume as a multiple of its rolling average
    #[serde(default = "default_volume_ratio")]
    pub volume_ratio: f64,
}

fn default_volume_ratio() -> f64 {
    1.0
}

impl Default for TradeFlow {
    fn default() -> Self {
        Self {
            large_buys: 0,
            large_sells: 0,
            notional: 0.0,
            volume_ratio: default_volume_ratio(),
        }
    }
}

impl TradeFlow {
    pub fn total_large_trades(&self) -> u32 {
        self.large_buys + self.large_sells
    }
}

/// One observation of a symbol's microstructure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub timestamp: TimestampMs,
    /// Signed orderbook imbalance, roughly in [-1, 1]. Positive = bid pressure.
    pub imbalance: f64,
    #[serde(default)]
    pub trade_flow: TradeFlow,
    pub last_price: f64,
    /// Recent bars, oldest first
    #[serde(default)]
    pub bars: Vec<PriceBar>,
    #[serde(default)]
    pub depth: OrderBookDepth,
}

impl MarketSnapshot {
    /// Minimal snapshot carrying only what the lifecycle tracker reads
    pub fn tick(symbol: &str, timestamp: TimestampMs, last_price: f64, imbalance: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp,
            imbalance,
            trade_flow: TradeFlow::default(),
            last_price,
            bars: Vec::new(),
            depth: OrderBookDepth::default(),
        }
    }

    pub fn has_valid_price(&self) -> bool {
        self.last_price.is_finite() && self.last_price > 0.0
    }
}
