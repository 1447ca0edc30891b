//! Position lifecycle tracker
//!
//! Owns one `ActivePosition` from admission to close. Every snapshot runs the
//! hard stop/target checks first; the reversal persistence filter only runs
//! once the protection window has elapsed and no partial close has happened.
//!
//! ```text
//! OPEN_PROTECTED ──(ts ≥ deadline)──▶ OPEN_ARMED
//!       │                                  │
//!       └──────(tp1)──▶ PARTIAL_CLOSED_BREAKEVEN ◀──(tp1)┘
//!                              │
//!   stop / tp2 / reversal / stale / shutdown ──▶ CLOSED
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::events::{FullyClosed, LifecycleEvent, PartialClosed, PositionLevels, SignalOpened};
use super::market::{MarketSnapshot, TimestampMs};
use super::position::{
    ActivePosition, CloseReason, LevelHit, LifecycleState, PartialCloseStatus, PositionError,
};
use super::risk::AdmissionToken;
use super::signal::CandidateSignal;

/// Exit behaviour of an open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Expected interval between snapshots of one symbol
    pub snapshot_cadence_ms: u64,
    /// Opposing imbalance magnitude that counts as a reversal sample
    pub reversal_threshold: f64,
    /// Reversal exits are suppressed for this long after open
    pub min_hold_secs: u64,
    /// Consecutive reversal samples required to exit
    pub persistence_samples: u32,
    /// Fraction of the size closed at tp1 (0 disables partial closing)
    pub partial_close_fraction: f64,
    pub move_stop_to_breakeven: bool,
    /// Missed cadence intervals tolerated before a position counts as stale
    pub stale_tolerance_samples: u32,
    /// Watchdog cycles a position may stay stale before it is force-closed
    pub max_stale_cycles: u32,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            snapshot_cadence_ms: 100,
            reversal_threshold: 0.40,
            min_hold_secs: 30,
            persistence_samples: 50,
            partial_close_fraction: 0.5,
            move_stop_to_breakeven: true,
            stale_tolerance_samples: 5,
            max_stale_cycles: 50,
        }
    }
}

impl ExitConfig {
    pub fn min_hold_ms(&self) -> u64 {
        self.min_hold_secs * 1_000
    }

    /// Silence longer than this marks a position stale
    pub fn stale_after_ms(&self) -> u64 {
        self.snapshot_cadence_ms * u64::from(self.stale_tolerance_samples)
    }

    pub fn partial_close_enabled(&self) -> bool {
        self.partial_close_fraction > 0.0 && self.partial_close_fraction < 1.0
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.snapshot_cadence_ms == 0 {
            return Err("snapshot_cadence_ms must be positive".to_string());
        }
        if !(self.reversal_threshold > 0.0 && self.reversal_threshold <= 1.0) {
            return Err(format!(
                "reversal_threshold {} must be in (0, 1]",
                self.reversal_threshold
            ));
        }
        if self.persistence_samples == 0 {
            return Err("persistence_samples must be at least 1".to_string());
        }
        if !(0.0..1.0).contains(&self.partial_close_fraction) {
            return Err(format!(
                "partial_close_fraction {} must be in [0, 1)",
                self.partial_close_fraction
            ));
        }
        if self.stale_tolerance_samples == 0 || self.max_stale_cycles == 0 {
            return Err("stale tolerance and max stale cycles must be positive".to_string());
        }
        Ok(())
    }
}

/// State machine for a single open position
#[derive(Debug)]
pub struct PositionTracker {
    position: ActivePosition,
    config: ExitConfig,
}

impl PositionTracker {
    /// Open a position for an admitted candidate. The token is consumed.
    pub fn open(
        candidate: CandidateSignal,
        token: AdmissionToken,
        config: ExitConfig,
        now: TimestampMs,
    ) -> Result<(Self, LifecycleEvent), PositionError> {
        if token.symbol() != candidate.symbol {
            return Err(PositionError::TokenMismatch {
                token: token.symbol().to_string(),
                candidate: candidate.symbol.clone(),
            });
        }
        candidate.validate().map_err(PositionError::InvalidLevels)?;

        let position = ActivePosition::new(candidate, now, config.min_hold_ms());
        info!(
            "Opened {} {} @ {:.6} | stop {:.6} tp1 {:.6} tp2 {:.6} | tier {} score {:.1} | protected until {}",
            position.signal.direction,
            position.symbol(),
            position.signal.entry_price,
            position.signal.stop_price,
            position.signal.tp1,
            position.signal.tp2,
            position.signal.tier,
            position.signal.quality_score,
            position.protection_deadline,
        );

        let event = LifecycleEvent::SignalOpened(SignalOpened {
            symbol: position.symbol().to_string(),
            direction: position.signal.direction,
            tier: position.signal.tier,
            quality_score: position.signal.quality_score,
            reward_risk: position.signal.reward_risk,
            levels: PositionLevels::of(&position),
            reasons: position.signal.reasons.clone(),
            protection_deadline: position.protection_deadline,
            at: now,
        });

        Ok((Self { position, config }, event))
    }

    pub fn position(&self) -> &ActivePosition {
        &self.position
    }

    pub fn state(&self) -> LifecycleState {
        self.position.state
    }

    pub fn is_closed(&self) -> bool {
        self.position.state.is_terminal()
    }

    pub fn symbol(&self) -> &str {
        self.position.symbol()
    }

    /// Evaluate one snapshot at its own timestamp. `received_at` is the clock
    /// reading when it arrived and only feeds the staleness watchdog.
    /// Returns the events produced by this step in order.
    pub fn on_snapshot(
        &mut self,
        snapshot: &MarketSnapshot,
        received_at: TimestampMs,
    ) -> Result<Vec<LifecycleEvent>, PositionError> {
        if self.is_closed() {
            return Err(PositionError::AlreadyClosed);
        }
        if snapshot.symbol != self.position.signal.symbol {
            return Err(PositionError::SymbolMismatch {
                expected: self.position.signal.symbol.clone(),
                got: snapshot.symbol.clone(),
            });
        }

        if !snapshot.has_valid_price() || snapshot.timestamp <= self.position.last_snapshot_ts {
            warn!(
                "{}: tracking anomaly, snapshot ts {} price {} not applied (last ts {})",
                self.symbol(),
                snapshot.timestamp,
                snapshot.last_price,
                self.position.last_snapshot_ts
            );
            return Ok(self.count_stale_cycle(received_at).into_iter().collect());
        }

        let gap = snapshot.timestamp - self.position.last_snapshot_ts;
        if gap > self.config.stale_after_ms() && self.position.reversal_count > 0 {
            warn!(
                "{}: cadence drift of {} ms, reversal counter {} reset",
                self.symbol(),
                gap,
                self.position.reversal_count
            );
            self.position.reversal_count = 0;
        }

        let price = snapshot.last_price;
        let now = snapshot.timestamp;
        self.position.last_price = price;
        self.position.last_snapshot_ts = now;
        self.position.last_seen_at = received_at;
        self.position.stale_cycles = 0;

        if let Some(event) = self.check_hard_exits(price, now) {
            return Ok(vec![event]);
        }

        if self.position.state == LifecycleState::PartialClosedBreakeven {
            return Ok(Vec::new());
        }

        if self.position.state == LifecycleState::OpenProtected {
            if now < self.position.protection_deadline {
                return Ok(Vec::new());
            }
            self.position.state = LifecycleState::OpenArmed;
            info!("{}: protection window over, reversal filter armed", self.symbol());
        }

        Ok(self.check_reversal(snapshot.imbalance, price, now).into_iter().collect())
    }

    /// Record a snapshot arrival on the clock's scale
    pub fn mark_seen(&mut self, received_at: TimestampMs) {
        self.position.last_seen_at = self.position.last_seen_at.max(received_at);
    }

    /// Staleness check, driven at the snapshot cadence
    pub fn on_watchdog(&mut self, now: TimestampMs) -> Option<LifecycleEvent> {
        if self.is_closed() {
            return None;
        }
        let silent_for = now.saturating_sub(self.position.last_seen_at);
        if silent_for <= self.config.stale_after_ms() {
            return None;
        }
        if self.position.stale_cycles == 0 {
            warn!(
                "{}: no snapshot for {} ms, evaluating against last price {:.6}",
                self.symbol(),
                silent_for,
                self.position.last_price
            );
        }
        self.count_stale_cycle(now)
    }

    /// Close whatever remains at the last known price
    pub fn force_close(&mut self, reason: CloseReason, now: TimestampMs) -> Option<LifecycleEvent> {
        if self.is_closed() {
            return None;
        }
        warn!(
            "{}: force close ({}) at last price {:.6}",
            self.symbol(),
            reason,
            self.position.last_price
        );
        let price = self.position.last_price;
        Some(self.close(reason, price, now))
    }

    fn count_stale_cycle(&mut self, now: TimestampMs) -> Option<LifecycleEvent> {
        self.position.stale_cycles += 1;
        debug!(
            "{}: stale cycle {}/{}",
            self.symbol(),
            self.position.stale_cycles,
            self.config.max_stale_cycles
        );
        if self.position.stale_cycles >= self.config.max_stale_cycles {
            self.force_close(CloseReason::Stale, now)
        } else {
            None
        }
    }

    /// Stop, tp2, then tp1. Runs before any reversal logic.
    fn check_hard_exits(&mut self, price: f64, now: TimestampMs) -> Option<LifecycleEvent> {
        let direction = self.position.signal.direction;

        if direction.is_adverse_cross(price, self.position.current_stop) {
            let at_breakeven = self.position.partial_status == PartialCloseStatus::Tp1Done
                && self.position.current_stop == self.position.signal.entry_price;
            return Some(if at_breakeven {
                let stop = self.position.current_stop;
                self.close(CloseReason::BreakevenStop, stop, now)
            } else {
                self.close(CloseReason::StopLoss, price, now)
            });
        }

        let tp2 = self.position.signal.tp2;
        if direction.is_favourable_cross(price, tp2) {
            self.position.tp2_hit = Some(LevelHit { price: tp2, at: now });
            return Some(self.close(CloseReason::TakeProfit2, tp2, now));
        }

        let tp1 = self.position.signal.tp1;
        if self.position.partial_status == PartialCloseStatus::None
            && direction.is_favourable_cross(price, tp1)
        {
            self.position.tp1_hit = Some(LevelHit { price: tp1, at: now });
            if !self.config.partial_close_enabled() {
                return Some(self.close(CloseReason::TakeProfit1, tp1, now));
            }
            return Some(self.partial_close(tp1, now));
        }

        None
    }

    fn partial_close(&mut self, fill: f64, now: TimestampMs) -> LifecycleEvent {
        let fraction = self.config.partial_close_fraction;
        let position = &mut self.position;
        let leg = position.signal.direction.return_pct(position.signal.entry_price, fill);
        let contribution = leg * fraction;

        position.realized_pnl_pct += contribution;
        position.remaining_fraction -= fraction;
        position.partial_status = PartialCloseStatus::Tp1Done;
        position.reversal_count = 0;
        position.state = LifecycleState::PartialClosedBreakeven;
        if self.config.move_stop_to_breakeven {
            position.current_stop = position.signal.entry_price;
        }

        info!(
            "{}: tp1 {:.6} reached, closed {:.0}% for {:+.2}%, stop now {:.6}",
            position.symbol(),
            fill,
            fraction * 100.0,
            leg,
            position.current_stop
        );

        LifecycleEvent::PartialClosed(PartialClosed {
            symbol: position.symbol().to_string(),
            direction: position.signal.direction,
            levels: PositionLevels::of(position),
            fill_price: fill,
            closed_fraction: fraction,
            leg_return_pct: leg,
            realized_pnl_pct: contribution,
            hold_ms: position.hold_ms(now),
            at: now,
        })
    }

    fn check_reversal(
        &mut self,
        imbalance: f64,
        price: f64,
        now: TimestampMs,
    ) -> Option<LifecycleEvent> {
        let opposing = self.position.signal.direction.opposing_magnitude(imbalance);

        if opposing >= self.config.reversal_threshold {
            self.position.reversal_count += 1;
            debug!(
                "{}: reversal sample {}/{} (opposing {:.3})",
                self.symbol(),
                self.position.reversal_count,
                self.config.persistence_samples,
                opposing
            );
            if self.position.reversal_count >= self.config.persistence_samples {
                return Some(self.close(CloseReason::ReversalConfirmed, price, now));
            }
        } else if self.position.reversal_count > 0 {
            debug!(
                "{}: reversal dissipated after {} samples",
                self.symbol(),
                self.position.reversal_count
            );
            self.position.reversal_count = 0;
        }

        None
    }

    fn close(&mut self, reason: CloseReason, fill: f64, now: TimestampMs) -> LifecycleEvent {
        let position = &mut self.position;
        let leg = position.signal.direction.return_pct(position.signal.entry_price, fill);
        let closed_fraction = position.remaining_fraction;
        let contribution = position.unrealized_pnl_pct(fill);
        let total = position.realized_pnl_pct + contribution;

        position.realized_pnl_pct = total;
        position.remaining_fraction = 0.0;
        position.state = LifecycleState::Closed;

        info!(
            "Closed {} {} ({}) @ {:.6} | leg {:+.2}% on {:.0}% | total {:+.2}% | held {} ms",
            position.signal.direction,
            position.symbol(),
            reason,
            fill,
            leg,
            closed_fraction * 100.0,
            total,
            position.hold_ms(now)
        );

        LifecycleEvent::FullyClosed(FullyClosed {
            symbol: position.symbol().to_string(),
            direction: position.signal.direction,
            reason,
            levels: PositionLevels::of(position),
            exit_price: fill,
            closed_fraction,
            leg_return_pct: leg,
            realized_pnl_pct: contribution,
            total_pnl_pct: total,
            tp1_hit: position.tp1_hit,
            hold_ms: position.hold_ms(now),
            needs_reconciliation: reason.needs_reconciliation(),
            at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::AdmissionToken;
    use crate::domain::signal::fixtures::{long_candidate, short_candidate};
    use approx::assert_relative_eq;

    fn open_long(config: ExitConfig) -> PositionTracker {
        let candidate = long_candidate("SOLUSDT");
        let token = AdmissionToken::for_tests("SOLUSDT");
        let (tracker, event) = PositionTracker::open(candidate, token, config, 0).unwrap();
        assert_eq!(event.kind(), "signal_opened");
        tracker
    }

    fn tick(ts: u64, price: f64, imbalance: f64) -> MarketSnapshot {
        MarketSnapshot::tick("SOLUSDT", ts, price, imbalance)
    }

    fn closed(events: &[LifecycleEvent]) -> &FullyClosed {
        events
            .iter()
            .find_map(|e| e.as_fully_closed())
            .expect("expected a close event")
    }

    #[test]
    fn test_open_rejects_mismatched_token() {
        let result = PositionTracker::open(
            long_candidate("SOLUSDT"),
            AdmissionToken::for_tests("ETHUSDT"),
            ExitConfig::default(),
            0,
        );
        assert!(matches!(result, Err(PositionError::TokenMismatch { .. })));
    }

    #[test]
    fn test_open_rejects_bad_ordering() {
        let mut candidate = long_candidate("SOLUSDT");
        candidate.stop_price = 101.0;
        let result = PositionTracker::open(
            candidate,
            AdmissionToken::for_tests("SOLUSDT"),
            ExitConfig::default(),
            0,
        );
        assert!(matches!(result, Err(PositionError::InvalidLevels(_))));
    }

    #[test]
    fn test_reversal_with_dissipation_and_resume() {
        let mut tracker = open_long(ExitConfig::default());
        let mut exit_at = None;

        for ts in (100..=60_000u64).step_by(100) {
            let opposing = (30_000..32_000).contains(&ts) || ts >= 45_000;
            let imbalance = if opposing { -0.45 } else { 0.10 };
            let events = tracker.on_snapshot(&tick(ts, 100.5, imbalance), ts).unwrap();

            if ts == 31_900 {
                assert_eq!(tracker.position().reversal_count, 20);
            }
            if ts == 32_000 {
                assert_eq!(tracker.position().reversal_count, 0);
            }
            if !events.is_empty() {
                let close = closed(&events);
                assert_eq!(close.reason, CloseReason::ReversalConfirmed);
                exit_at = Some(ts);
                break;
            }
        }

        assert_eq!(exit_at, Some(49_900));
        assert!(tracker.is_closed());
    }

    #[test]
    fn test_no_reversal_inside_protection_window() {
        let mut tracker = open_long(ExitConfig::default());
        for i in 1..=50u64 {
            let ts = i * 100;
            let events = tracker.on_snapshot(&tick(ts, 100.2, -0.9), ts).unwrap();
            assert!(events.is_empty());
        }
        assert_eq!(tracker.state(), LifecycleState::OpenProtected);
        assert_eq!(tracker.position().reversal_count, 0);
    }

    #[test]
    fn test_armed_exactly_at_deadline() {
        let mut tracker = open_long(ExitConfig::default());
        tracker.on_snapshot(&tick(29_900, 100.1, 0.0), 29_900).unwrap();
        assert_eq!(tracker.state(), LifecycleState::OpenProtected);
        tracker.on_snapshot(&tick(30_000, 100.1, 0.0), 30_000).unwrap();
        assert_eq!(tracker.state(), LifecycleState::OpenArmed);
    }

    #[test]
    fn test_stop_precedes_reversal() {
        let mut tracker = open_long(ExitConfig::default());
        let mut ts = 30_000;
        for _ in 0..49 {
            tracker.on_snapshot(&tick(ts, 99.0, -0.6), ts).unwrap();
            ts += 100;
        }
        assert_eq!(tracker.position().reversal_count, 49);

        let events = tracker.on_snapshot(&tick(ts, 95.5, -0.6), ts).unwrap();
        let close = closed(&events);
        assert_eq!(close.reason, CloseReason::StopLoss);
        assert_relative_eq!(close.exit_price, 95.5);
        assert_relative_eq!(close.total_pnl_pct, -4.5, epsilon = 1e-9);
    }

    #[test]
    fn test_partial_then_breakeven() {
        let mut tracker = open_long(ExitConfig::default());

        let events = tracker.on_snapshot(&tick(270_000, 103.0, 0.2), 270_000).unwrap();
        let partial = events[0].as_partial_closed().unwrap();
        assert_relative_eq!(partial.closed_fraction, 0.5);
        assert_relative_eq!(partial.leg_return_pct, 3.0, epsilon = 1e-9);
        assert_relative_eq!(partial.realized_pnl_pct, 1.5, epsilon = 1e-9);
        assert_eq!(tracker.state(), LifecycleState::PartialClosedBreakeven);
        assert_eq!(tracker.position().current_stop, 100.0);
        assert_relative_eq!(tracker.position().remaining_fraction, 0.5);

        // no reversal logic once partially closed
        let events = tracker.on_snapshot(&tick(270_100, 101.0, -0.9), 270_100).unwrap();
        assert!(events.is_empty());

        let events = tracker.on_snapshot(&tick(270_200, 100.0, 0.0), 270_200).unwrap();
        let close = closed(&events);
        assert_eq!(close.reason, CloseReason::BreakevenStop);
        assert_relative_eq!(close.exit_price, 100.0);
        assert_relative_eq!(close.realized_pnl_pct, 0.0, epsilon = 1e-9);
        assert_relative_eq!(close.total_pnl_pct, 1.5, epsilon = 1e-9);
        assert!(close.tp1_hit.is_some());
    }

    #[test]
    fn test_partial_then_tp2_combines_legs() {
        let mut tracker = open_long(ExitConfig::default());
        tracker.on_snapshot(&tick(1_000, 103.5, 0.2), 1_000).unwrap();
        let events = tracker.on_snapshot(&tick(2_000, 106.4, 0.2), 2_000).unwrap();
        let close = closed(&events);
        assert_eq!(close.reason, CloseReason::TakeProfit2);
        assert_relative_eq!(close.exit_price, 106.0);
        // 0.5 × 3% + 0.5 × 6%
        assert_relative_eq!(close.total_pnl_pct, 4.5, epsilon = 1e-9);
    }

    #[test]
    fn test_gap_through_tp2_closes_fully() {
        let mut tracker = open_long(ExitConfig::default());
        let events = tracker.on_snapshot(&tick(500, 107.0, 0.2), 500).unwrap();
        assert_eq!(events.len(), 1);
        let close = closed(&events);
        assert_eq!(close.reason, CloseReason::TakeProfit2);
        assert_relative_eq!(close.closed_fraction, 1.0);
        assert_relative_eq!(close.total_pnl_pct, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tp1_without_partial_closes_fully() {
        let config = ExitConfig {
            partial_close_fraction: 0.0,
            ..ExitConfig::default()
        };
        let mut tracker = open_long(config);
        let events = tracker.on_snapshot(&tick(500, 103.0, 0.2), 500).unwrap();
        let close = closed(&events);
        assert_eq!(close.reason, CloseReason::TakeProfit1);
        assert_relative_eq!(close.total_pnl_pct, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_stop_loss() {
        let (mut tracker, _) = PositionTracker::open(
            short_candidate("SOLUSDT"),
            AdmissionToken::for_tests("SOLUSDT"),
            ExitConfig::default(),
            0,
        )
        .unwrap();
        let events = tracker.on_snapshot(&tick(100, 104.1, 0.0), 100).unwrap();
        let close = closed(&events);
        assert_eq!(close.reason, CloseReason::StopLoss);
        assert!(close.total_pnl_pct < 0.0);
    }

    #[test]
    fn test_out_of_order_snapshot_not_applied() {
        let mut tracker = open_long(ExitConfig::default());
        tracker.on_snapshot(&tick(1_000, 101.0, 0.0), 1_000).unwrap();
        let events = tracker.on_snapshot(&tick(900, 90.0, 0.0), 1_100).unwrap();
        assert!(events.is_empty());
        assert_eq!(tracker.position().last_price, 101.0);
        assert_eq!(tracker.position().stale_cycles, 1);
    }

    #[test]
    fn test_drift_resets_reversal_counter() {
        let mut tracker = open_long(ExitConfig::default());
        tracker.on_snapshot(&tick(30_000, 100.5, -0.6), 30_000).unwrap();
        tracker.on_snapshot(&tick(30_100, 100.5, -0.6), 30_100).unwrap();
        assert_eq!(tracker.position().reversal_count, 2);

        tracker.on_snapshot(&tick(31_000, 100.5, -0.6), 31_000).unwrap();
        assert_eq!(tracker.position().reversal_count, 1);
    }

    #[test]
    fn test_stale_position_force_closes() {
        let config = ExitConfig {
            max_stale_cycles: 3,
            ..ExitConfig::default()
        };
        let mut tracker = open_long(config);
        tracker.on_snapshot(&tick(100, 101.0, 0.0), 100).unwrap();

        assert!(tracker.on_watchdog(500).is_none());
        assert_eq!(tracker.position().stale_cycles, 0);
        assert!(tracker.on_watchdog(700).is_none());
        assert!(tracker.on_watchdog(800).is_none());
        let event = tracker.on_watchdog(900).unwrap();
        let close = event.as_fully_closed().unwrap();
        assert_eq!(close.reason, CloseReason::Stale);
        assert!(close.needs_reconciliation);
        assert_relative_eq!(close.exit_price, 101.0);
        assert!(tracker.on_watchdog(1_000).is_none());
    }

    #[test]
    fn test_late_arrival_is_evaluated_at_snapshot_time() {
        let mut tracker = open_long(ExitConfig::default());

        // received long after the window closed, but stamped inside it
        let events = tracker.on_snapshot(&tick(29_900, 100.5, -0.9), 45_000).unwrap();
        assert!(events.is_empty());
        assert_eq!(tracker.state(), LifecycleState::OpenProtected);
        assert_eq!(tracker.position().reversal_count, 0);
        assert_eq!(tracker.position().last_seen_at, 45_000);

        let events = tracker.on_snapshot(&tick(30_000, 100.5, -0.9), 45_000).unwrap();
        assert!(events.is_empty());
        assert_eq!(tracker.state(), LifecycleState::OpenArmed);
        assert_eq!(tracker.position().reversal_count, 1);
    }

    #[test]
    fn test_fresh_snapshot_resets_stale_counter() {
        let mut tracker = open_long(ExitConfig::default());
        tracker.on_watchdog(1_000);
        tracker.on_watchdog(1_100);
        assert_eq!(tracker.position().stale_cycles, 2);
        tracker.on_snapshot(&tick(1_200, 100.0, 0.0), 1_200).unwrap();
        assert_eq!(tracker.position().stale_cycles, 0);
    }

    #[test]
    fn test_closed_tracker_rejects_snapshots() {
        let mut tracker = open_long(ExitConfig::default());
        let event = tracker.force_close(CloseReason::Shutdown, 10).unwrap();
        assert!(event.as_fully_closed().unwrap().needs_reconciliation);
        assert!(tracker.force_close(CloseReason::Shutdown, 20).is_none());
        assert_eq!(
            tracker.on_snapshot(&tick(100, 100.0, 0.0), 100).unwrap_err(),
            PositionError::AlreadyClosed
        );
    }

    #[test]
    fn test_exit_config_validation() {
        assert!(ExitConfig::default().validate().is_ok());
        let bad = ExitConfig {
            persistence_samples: 0,
            ..ExitConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
