//! Domain Layer - core types and state machines for the signal engine
//!
//! Pure logic with no I/O. Time is always passed in by the caller.
//!
//! - `market`: snapshots, bars and orderbook depth
//! - `signal`: directions, tiers and qualified candidates
//! - `risk`: portfolio admission (daily caps, concurrency, correlation)
//! - `position` / `tracker`: the per-position lifecycle state machine
//! - `events`: lifecycle events emitted on transitions
//! - `performance`: win/loss, PnL, Sharpe and drawdown over closed positions

pub mod events;
pub mod market;
pub mod performance;
pub mod position;
pub mod risk;
pub mod signal;
pub mod tracker;

pub use events::{FullyClosed, LifecycleEvent, PartialClosed, PositionLevels, SignalOpened};
pub use market::{MarketSnapshot, OrderBookDepth, PriceBar, TimestampMs, TradeFlow, VolatilityRegime};
pub use performance::PerformanceStats;
pub use position::{
    ActivePosition, CloseReason, LevelHit, LifecycleState, PartialCloseStatus, PositionError,
};
pub use risk::{
    AdmissionConfig, AdmissionRejection, AdmissionToken, CorrelationOverride, CorrelationScope,
    DailyStats, RiskManager, TierCaps,
};
pub use signal::{CandidateSignal, Direction, LevelReasons, PriorityTier};
pub use tracker::{ExitConfig, PositionTracker};
