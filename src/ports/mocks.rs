use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{CloseReason, LifecycleEvent, MarketSnapshot};
use crate::ports::events::{EventSink, SinkError};
use crate::ports::market_data::{FeedError, SnapshotFeed};

/// Sink that records every published event. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_for(&self, symbol: &str) -> Vec<LifecycleEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.symbol() == symbol)
            .collect()
    }

    /// Close reasons in publication order
    pub fn close_reasons(&self) -> Vec<(String, CloseReason)> {
        self.events()
            .iter()
            .filter_map(|e| e.as_fully_closed())
            .map(|c| (c.symbol.clone(), c.reason))
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    fn name(&self) -> String {
        "recording".to_string()
    }

    async fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Sink that fails its first `failures` publishes, then records like `RecordingSink`
#[derive(Debug, Clone)]
pub struct FlakySink {
    remaining_failures: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
    inner: RecordingSink,
}

impl FlakySink {
    pub fn new(failures: u32) -> Self {
        Self {
            remaining_failures: Arc::new(AtomicU32::new(failures)),
            attempts: Arc::new(AtomicU32::new(0)),
            inner: RecordingSink::new(),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<LifecycleEvent> {
        self.inner.events()
    }
}

#[async_trait]
impl EventSink for FlakySink {
    fn name(&self) -> String {
        "flaky".to_string()
    }

    async fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SinkError::Unavailable("injected failure".to_string()));
        }
        self.inner.publish(event).await
    }
}

/// In-memory feed over a fixed list of snapshots
#[derive(Debug, Default)]
pub struct VecFeed {
    snapshots: VecDeque<MarketSnapshot>,
    started: bool,
}

impl VecFeed {
    pub fn new(snapshots: Vec<MarketSnapshot>) -> Self {
        Self {
            snapshots: snapshots.into(),
            started: false,
        }
    }
}

#[async_trait]
impl SnapshotFeed for VecFeed {
    async fn start(&mut self) -> Result<mpsc::Receiver<MarketSnapshot>, FeedError> {
        if self.started {
            return Err(FeedError::AlreadyStarted);
        }
        self.started = true;

        let snapshots: Vec<_> = self.snapshots.drain(..).collect();
        let (tx, rx) = mpsc::channel(snapshots.len().max(1));
        for snapshot in snapshots {
            // capacity covers every snapshot, so this never waits
            if tx.try_send(snapshot).is_err() {
                break;
            }
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::fixtures::long_candidate;
    use crate::domain::{ActivePosition, PositionLevels, SignalOpened};

    fn opened() -> LifecycleEvent {
        let position = ActivePosition::new(long_candidate("BTCUSDT"), 0, 30_000);
        LifecycleEvent::SignalOpened(SignalOpened {
            symbol: "BTCUSDT".to_string(),
            direction: position.signal.direction,
            tier: position.signal.tier,
            quality_score: 85.0,
            reward_risk: 1.0,
            levels: PositionLevels::of(&position),
            reasons: position.signal.reasons.clone(),
            protection_deadline: 30_000,
            at: 0,
        })
    }

    #[tokio::test]
    async fn test_flaky_sink_recovers() {
        let sink = FlakySink::new(2);
        assert!(sink.publish(&opened()).await.is_err());
        assert!(sink.publish(&opened()).await.is_err());
        assert!(sink.publish(&opened()).await.is_ok());
        assert_eq!(sink.attempts(), 3);
        assert_eq!(sink.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_vec_feed_delivers_in_order() {
        let mut feed = VecFeed::new(vec![
            MarketSnapshot::tick("BTCUSDT", 1, 100.0, 0.0),
            MarketSnapshot::tick("BTCUSDT", 2, 101.0, 0.0),
        ]);
        let mut rx = feed.start().await.unwrap();
        assert_eq!(rx.recv().await.unwrap().timestamp, 1);
        assert_eq!(rx.recv().await.unwrap().timestamp, 2);
        assert!(rx.recv().await.is_none());
        assert!(matches!(feed.start().await, Err(FeedError::AlreadyStarted)));
    }
}
