//! Symbol Session
//!
//! Everything the engine keeps for one symbol: the entry confirmation
//! counter while flat, and the position tracker while a position is open.
//! A session is owned by exactly one worker task.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::pipeline::{EvaluationError, SignalPipeline};
use crate::domain::{
    ActivePosition, CloseReason, ExitConfig, LifecycleEvent, MarketSnapshot, PositionTracker,
    RiskManager, TimestampMs,
};
use crate::strategy::EntryConfirmation;

/// Per-symbol counters, reported on shutdown
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub snapshots: u64,
    pub deferred: u64,
    pub rejected: u64,
    pub admission_rejected: u64,
    pub opened: u64,
    pub closed: u64,
}

#[derive(Debug)]
pub struct SymbolSession {
    symbol: String,
    pipeline: Arc<SignalPipeline>,
    risk: Arc<Mutex<RiskManager>>,
    exit: ExitConfig,
    confirmation: EntryConfirmation,
    tracker: Option<PositionTracker>,
    stats: SessionStats,
}

impl SymbolSession {
    pub fn new(
        symbol: &str,
        pipeline: Arc<SignalPipeline>,
        risk: Arc<Mutex<RiskManager>>,
        exit: ExitConfig,
        entry_persistence_samples: u32,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            pipeline,
            risk,
            exit,
            confirmation: EntryConfirmation::new(entry_persistence_samples),
            tracker: None,
            stats: SessionStats::default(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn position(&self) -> Option<&ActivePosition> {
        self.tracker.as_ref().map(|t| t.position())
    }

    pub fn has_open_position(&self) -> bool {
        self.tracker.is_some()
    }

    /// Apply one snapshot: track the open position, or look for an entry while flat.
    /// The snapshot is evaluated at its own timestamp; `received_at` only
    /// feeds the staleness watchdog.
    pub fn on_snapshot(&mut self, snapshot: &MarketSnapshot, received_at: TimestampMs) -> Vec<LifecycleEvent> {
        self.stats.snapshots += 1;

        if let Some(tracker) = self.tracker.as_mut() {
            let events = match tracker.on_snapshot(snapshot, received_at) {
                Ok(events) => events,
                Err(e) => {
                    warn!("{}: snapshot not applied: {}", self.symbol, e);
                    Vec::new()
                }
            };
            self.retire_if_closed();
            return events;
        }

        self.evaluate_entry(snapshot, received_at).into_iter().collect()
    }

    pub fn on_watchdog(&mut self, now: TimestampMs) -> Option<LifecycleEvent> {
        let event = self.tracker.as_mut()?.on_watchdog(now);
        self.retire_if_closed();
        event
    }

    /// Controlled close from outside the tracker (shutdown)
    pub fn force_close(&mut self, reason: CloseReason, now: TimestampMs) -> Option<LifecycleEvent> {
        let event = self.tracker.as_mut()?.force_close(reason, now);
        self.retire_if_closed();
        event
    }

    fn evaluate_entry(&mut self, snapshot: &MarketSnapshot, received_at: TimestampMs) -> Option<LifecycleEvent> {
        let candidate = match self.pipeline.evaluate(snapshot) {
            Ok(candidate) => candidate,
            Err(EvaluationError::Deferred(reason)) => {
                self.stats.deferred += 1;
                debug!(
                    "{}: evaluation deferred with {} confirming sample(s) held: {}",
                    self.symbol,
                    self.confirmation.count(),
                    reason
                );
                return None;
            }
            Err(EvaluationError::Rejected(reason)) => {
                self.stats.rejected += 1;
                debug!("{}: no candidate: {}", self.symbol, reason);
                self.confirmation.observe(None);
                return None;
            }
        };

        if !self.confirmation.observe(Some(candidate.direction)) {
            return None;
        }

        let admission = self
            .risk
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .admit(&candidate);
        let token = match admission {
            Ok(token) => token,
            Err(rejection) => {
                self.stats.admission_rejected += 1;
                info!("{}: {} candidate not admitted: {}", self.symbol, candidate.tier, rejection);
                return None;
            }
        };

        match PositionTracker::open(candidate, token, self.exit.clone(), snapshot.timestamp) {
            Ok((mut tracker, event)) => {
                tracker.mark_seen(received_at);
                self.stats.opened += 1;
                self.tracker = Some(tracker);
                Some(event)
            }
            Err(e) => {
                warn!("{}: admitted candidate failed to open: {}", self.symbol, e);
                self.release();
                None
            }
        }
    }

    fn retire_if_closed(&mut self) {
        if self.tracker.as_ref().is_some_and(|t| t.is_closed()) {
            self.tracker = None;
            self.stats.closed += 1;
            self.release();
        }
    }

    fn release(&self) {
        self.risk
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release(&self.symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::fixtures::qualifying;
    use crate::config::Config;
    use crate::domain::{AdmissionConfig, LifecycleState};

    fn session(symbol: &str, risk: Arc<Mutex<RiskManager>>, persistence: u32) -> SymbolSession {
        let config = Config::default();
        SymbolSession::new(
            symbol,
            Arc::new(SignalPipeline::from_config(&config)),
            risk,
            config.exit.clone(),
            persistence,
        )
    }

    fn shared_risk() -> Arc<Mutex<RiskManager>> {
        Arc::new(Mutex::new(RiskManager::new(AdmissionConfig::default())))
    }

    #[test]
    fn test_opens_then_tracks() {
        let risk = shared_risk();
        let mut session = session("SOLUSDT", risk.clone(), 1);

        let events = session.on_snapshot(&qualifying("SOLUSDT", 1_000, 0.40), 1_000);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "signal_opened");
        assert!(session.has_open_position());
        assert!(risk.lock().unwrap().is_open("SOLUSDT"));

        // a second qualifying snapshot is tracked, not re-entered
        let events = session.on_snapshot(&qualifying("SOLUSDT", 1_100, 0.40), 1_100);
        assert!(events.is_empty());
        assert_eq!(session.position().unwrap().state, LifecycleState::OpenProtected);
        assert_eq!(session.stats().opened, 1);
    }

    #[test]
    fn test_open_uses_snapshot_time() {
        let mut session = session("SOLUSDT", shared_risk(), 1);

        // received 20 s after it was stamped
        let events = session.on_snapshot(&qualifying("SOLUSDT", 1_000, 0.40), 21_000);
        let opened = match &events[0] {
            LifecycleEvent::SignalOpened(opened) => opened,
            other => panic!("unexpected event: {:?}", other),
        };
        assert_eq!(opened.at, 1_000);
        assert_eq!(opened.protection_deadline, 31_000);

        let position = session.position().unwrap();
        assert_eq!(position.opened_at, 1_000);
        assert_eq!(position.last_seen_at, 21_000);
    }

    #[test]
    fn test_entry_persistence() {
        let mut session = session("SOLUSDT", shared_risk(), 3);
        assert!(session.on_snapshot(&qualifying("SOLUSDT", 1_000, 0.40), 1_000).is_empty());
        assert!(session.on_snapshot(&qualifying("SOLUSDT", 1_100, 0.40), 1_100).is_empty());
        let events = session.on_snapshot(&qualifying("SOLUSDT", 1_200, 0.40), 1_200);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_close_releases_admission_slot() {
        let risk = shared_risk();
        let mut session = session("SOLUSDT", risk.clone(), 1);
        session.on_snapshot(&qualifying("SOLUSDT", 1_000, 0.40), 1_000);

        let event = session.force_close(CloseReason::Shutdown, 2_000).unwrap();
        assert!(event.as_fully_closed().unwrap().needs_reconciliation);
        assert!(!session.has_open_position());
        assert!(!risk.lock().unwrap().is_open("SOLUSDT"));
        assert_eq!(session.stats().closed, 1);
    }

    #[test]
    fn test_admission_rejection_keeps_session_flat() {
        let risk = shared_risk();
        let mut btc = session("BTCUSDT", risk.clone(), 1);
        let mut eth = session("ETHUSDT", risk.clone(), 1);

        assert_eq!(btc.on_snapshot(&qualifying("BTCUSDT", 1_000, 0.40), 1_000).len(), 1);
        assert!(eth.on_snapshot(&qualifying("ETHUSDT", 1_000, 0.40), 1_000).is_empty());
        assert!(!eth.has_open_position());
        assert_eq!(eth.stats().admission_rejected, 1);
    }
}
