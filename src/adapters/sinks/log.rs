//! Lifecycle events rendered through `tracing`

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::LifecycleEvent;
use crate::ports::{EventSink, SinkError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }

    /// One-line human summary of an event
    pub fn render(event: &LifecycleEvent) -> String {
        match event {
            LifecycleEvent::SignalOpened(e) => format!(
                "OPEN {} {} [{}] entry {:.6} stop {:.6} tp1 {:.6} tp2 {:.6} (score {:.1}, R:R {:.2})",
                e.symbol,
                e.direction,
                e.tier,
                e.levels.entry,
                e.levels.current_stop,
                e.levels.tp1,
                e.levels.tp2,
                e.quality_score,
                e.reward_risk
            ),
            LifecycleEvent::PartialClosed(e) => format!(
                "PARTIAL {} {} {:.0}% at {:.6} ({:+.3}%), stop now {:.6}",
                e.symbol,
                e.direction,
                e.closed_fraction * 100.0,
                e.fill_price,
                e.leg_return_pct,
                e.levels.current_stop
            ),
            LifecycleEvent::FullyClosed(e) => format!(
                "CLOSE {} {} {} at {:.6} total {:+.3}% after {}s",
                e.symbol,
                e.direction,
                e.reason,
                e.exit_price,
                e.total_pnl_pct,
                e.hold_ms / 1_000
            ),
        }
    }
}

#[async_trait]
impl EventSink for LogSink {
    fn name(&self) -> String {
        "log".to_string()
    }

    async fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError> {
        let line = Self::render(event);
        match event.as_fully_closed() {
            Some(closed) if closed.needs_reconciliation => warn!("{} (needs reconciliation)", line),
            _ => info!("{}", line),
        }
        Ok(())
    }
}
