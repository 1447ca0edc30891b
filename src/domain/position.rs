use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::market::TimestampMs;
use super::signal::CandidateSignal;

/// Lifecycle state of a tracked position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Inside the minimum hold window; reversal exits suppressed
    OpenProtected,
    /// Hold window elapsed; reversal persistence filter active
    OpenArmed,
    /// Part of the size banked at tp1, stop moved to entry
    PartialClosedBreakeven,
    Closed,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Closed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::OpenProtected => "OPEN_PROTECTED",
            LifecycleState::OpenArmed => "OPEN_ARMED",
            LifecycleState::PartialClosedBreakeven => "PARTIAL_CLOSED_BREAKEVEN",
            LifecycleState::Closed => "CLOSED",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartialCloseStatus {
    None,
    Tp1Done,
}

/// Why a position was fully closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    /// tp1 reached with partial closing disabled
    TakeProfit1,
    TakeProfit2,
    StopLoss,
    BreakevenStop,
    ReversalConfirmed,
    Stale,
    Shutdown,
}

impl CloseReason {
    /// Closes that were forced without a fresh price and need reconciling
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, CloseReason::Stale | CloseReason::Shutdown)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloseReason::TakeProfit1 => "TAKE_PROFIT_1",
            CloseReason::TakeProfit2 => "TAKE_PROFIT_2",
            CloseReason::StopLoss => "STOP_LOSS",
            CloseReason::BreakevenStop => "BREAKEVEN_STOP",
            CloseReason::ReversalConfirmed => "REVERSAL_CONFIRMED",
            CloseReason::Stale => "STALE",
            CloseReason::Shutdown => "SHUTDOWN",
        };
        write!(f, "{}", name)
    }
}

/// Price and time at which a target was reached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelHit {
    pub price: f64,
    pub at: TimestampMs,
}

#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("Position is already closed")]
    AlreadyClosed,
    #[error("Snapshot for {got} routed to tracker for {expected}")]
    SymbolMismatch { expected: String, got: String },
    #[error("Admission token for {token} does not match candidate {candidate}")]
    TokenMismatch { token: String, candidate: String },
    #[error("Invalid levels: {0}")]
    InvalidLevels(String),
}

/// State of one open position. Owned and mutated only by its tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePosition {
    pub signal: CandidateSignal,
    pub opened_at: TimestampMs,
    pub state: LifecycleState,
    /// Consecutive snapshots with opposing imbalance at or above the reversal threshold
    pub reversal_count: u32,
    /// `opened_at + min_hold`; fixed at open
    pub protection_deadline: TimestampMs,
    pub partial_status: PartialCloseStatus,
    /// Active stop; moves to entry after a tp1 partial close
    pub current_stop: f64,
    /// Fraction of the original size still open (1.0 at open)
    pub remaining_fraction: f64,
    /// Sum of closed legs, in percent of entry weighted by closed size
    pub realized_pnl_pct: f64,
    pub tp1_hit: Option<LevelHit>,
    pub tp2_hit: Option<LevelHit>,
    pub last_price: f64,
    /// Timestamp of the last applied snapshot
    pub last_snapshot_ts: TimestampMs,
    /// Clock reading when the last snapshot was applied
    pub last_seen_at: TimestampMs,
    pub stale_cycles: u32,
}

impl ActivePosition {
    pub fn new(signal: CandidateSignal, opened_at: TimestampMs, min_hold_ms: u64) -> Self {
        let current_stop = signal.stop_price;
        let last_price = signal.entry_price;
        let last_snapshot_ts = signal.created_at;
        Self {
            signal,
            opened_at,
            state: LifecycleState::OpenProtected,
            reversal_count: 0,
            protection_deadline: opened_at + min_hold_ms,
            partial_status: PartialCloseStatus::None,
            current_stop,
            remaining_fraction: 1.0,
            realized_pnl_pct: 0.0,
            tp1_hit: None,
            tp2_hit: None,
            last_price,
            last_snapshot_ts,
            last_seen_at: opened_at,
            stale_cycles: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.signal.symbol
    }

    pub fn hold_ms(&self, now: TimestampMs) -> u64 {
        now.saturating_sub(self.opened_at)
    }

    /// Unrealized PnL on the open remainder at `price`, in percent of entry
    pub fn unrealized_pnl_pct(&self, price: f64) -> f64 {
        self.signal.direction.return_pct(self.signal.entry_price, price) * self.remaining_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::fixtures::long_candidate;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_position_starts_protected() {
        let position = ActivePosition::new(long_candidate("ETHUSDT"), 1_000, 30_000);
        assert_eq!(position.state, LifecycleState::OpenProtected);
        assert_eq!(position.protection_deadline, 31_000);
        assert_eq!(position.current_stop, 95.9);
        assert_eq!(position.remaining_fraction, 1.0);
        assert_eq!(position.partial_status, PartialCloseStatus::None);
        assert_eq!(position.reversal_count, 0);
    }

    #[test]
    fn test_unrealized_pnl_scales_with_remainder() {
        let mut position = ActivePosition::new(long_candidate("ETHUSDT"), 0, 30_000);
        assert_relative_eq!(position.unrealized_pnl_pct(102.0), 2.0, epsilon = 1e-9);
        position.remaining_fraction = 0.5;
        assert_relative_eq!(position.unrealized_pnl_pct(102.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reconciliation_flags() {
        assert!(CloseReason::Stale.needs_reconciliation());
        assert!(CloseReason::Shutdown.needs_reconciliation());
        assert!(!CloseReason::StopLoss.needs_reconciliation());
        assert_eq!(CloseReason::BreakevenStop.to_string(), "BREAKEVEN_STOP");
    }
}
