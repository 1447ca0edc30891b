//! Lifecycle events
//!
//! One event per transition of interest. Events are emitted after the
//! transition is committed in memory and are the only durable record of a
//! position once it closes.

use serde::{Deserialize, Serialize};

use super::market::TimestampMs;
use super::position::{ActivePosition, CloseReason, LevelHit};
use super::signal::{Direction, LevelReasons, PriorityTier};

/// All price levels of a position at the time of the event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionLevels {
    pub entry: f64,
    pub initial_stop: f64,
    pub current_stop: f64,
    pub tp1: f64,
    pub tp2: f64,
}

impl PositionLevels {
    pub fn of(position: &ActivePosition) -> Self {
        Self {
            entry: position.signal.entry_price,
            initial_stop: position.signal.stop_price,
            current_stop: position.current_stop,
            tp1: position.signal.tp1,
            tp2: position.signal.tp2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOpened {
    pub symbol: String,
    pub direction: Direction,
    pub tier: PriorityTier,
    pub quality_score: f64,
    pub reward_risk: f64,
    pub levels: PositionLevels,
    pub reasons: LevelReasons,
    pub protection_deadline: TimestampMs,
    pub at: TimestampMs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialClosed {
    pub symbol: String,
    pub direction: Direction,
    pub levels: PositionLevels,
    pub fill_price: f64,
    /// Fraction of the original size closed by this leg
    pub closed_fraction: f64,
    /// Percent move from entry to fill, positive in favour
    pub leg_return_pct: f64,
    /// `leg_return_pct × closed_fraction`
    pub realized_pnl_pct: f64,
    pub hold_ms: u64,
    pub at: TimestampMs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullyClosed {
    pub symbol: String,
    pub direction: Direction,
    pub reason: CloseReason,
    pub levels: PositionLevels,
    pub exit_price: f64,
    pub closed_fraction: f64,
    pub leg_return_pct: f64,
    /// Contribution of this final leg
    pub realized_pnl_pct: f64,
    /// Whole-position PnL including any earlier partial close
    pub total_pnl_pct: f64,
    pub tp1_hit: Option<LevelHit>,
    pub hold_ms: u64,
    pub needs_reconciliation: bool,
    pub at: TimestampMs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    SignalOpened(SignalOpened),
    PartialClosed(PartialClosed),
    FullyClosed(FullyClosed),
}

impl LifecycleEvent {
    pub fn symbol(&self) -> &str {
        match self {
            LifecycleEvent::SignalOpened(e) => &e.symbol,
            LifecycleEvent::PartialClosed(e) => &e.symbol,
            LifecycleEvent::FullyClosed(e) => &e.symbol,
        }
    }

    pub fn at(&self) -> TimestampMs {
        match self {
            LifecycleEvent::SignalOpened(e) => e.at,
            LifecycleEvent::PartialClosed(e) => e.at,
            LifecycleEvent::FullyClosed(e) => e.at,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::SignalOpened(_) => "signal_opened",
            LifecycleEvent::PartialClosed(_) => "partial_closed",
            LifecycleEvent::FullyClosed(_) => "fully_closed",
        }
    }

    pub fn as_fully_closed(&self) -> Option<&FullyClosed> {
        match self {
            LifecycleEvent::FullyClosed(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_partial_closed(&self) -> Option<&PartialClosed> {
        match self {
            LifecycleEvent::PartialClosed(e) => Some(e),
            _ => None,
        }
    }
}
