//! Replay Runner
//!
//! Wires a snapshot feed, the signal engine and the event dispatcher into one
//! run. Snapshots are evaluated at their own timestamps; the manual clock
//! follows the feed so the staleness watchdog also runs in feed time.
//! Every event passes through a performance tap on its way to the sinks.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::dispatcher::{DispatchStats, EventDispatcher};
use crate::application::engine::{EngineError, ShutdownReport, SignalEngine};
use crate::config::Config;
use crate::domain::{LifecycleEvent, PerformanceStats};
use crate::ports::{EventSink, FeedError, ManualClock, SnapshotFeed};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Event dispatcher failed: {0}")]
    Dispatcher(String),

    #[error("Performance tap failed: {0}")]
    Performance(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub snapshots: u64,
    pub skipped: u64,
    /// Stopped by the stop signal before the feed ended
    pub interrupted: bool,
    #[serde(skip)]
    pub shutdown: ShutdownReport,
    pub dispatch: DispatchStats,
    pub performance: PerformanceStats,
}

pub struct ReplayRunner {
    config: Config,
    clock: Arc<ManualClock>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl ReplayRunner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Arc::new(ManualClock::new(0)),
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }

    /// Replay `feed` until it ends or `stop` resolves, then shut the engine
    /// down and wait for every event to be dispatched.
    pub async fn run<F, S>(self, feed: &mut F, stop: S) -> Result<RunSummary, RunError>
    where
        F: SnapshotFeed + ?Sized,
        S: Future<Output = ()>,
    {
        let (dispatch_tx, rx) = mpsc::unbounded_channel();
        let dispatcher = self
            .sinks
            .iter()
            .fold(EventDispatcher::new(self.config.dispatch.clone()), |d, sink| {
                d.with_sink(Arc::clone(sink))
            });
        let dispatch_handle = dispatcher.spawn(rx);

        let (tx, events) = mpsc::unbounded_channel();
        let performance_handle = spawn_performance_tap(events, dispatch_tx);

        let mut engine = SignalEngine::new(&self.config, self.clock.clone(), tx);
        let mut snapshots = feed.start().await?;
        let mut summary = RunSummary::default();

        tokio::pin!(stop);
        loop {
            tokio::select! {
                biased;
                _ = &mut stop => {
                    info!("Stop requested after {} snapshots", summary.snapshots);
                    summary.interrupted = true;
                    break;
                }
                next = snapshots.recv() => {
                    let Some(snapshot) = next else { break };
                    self.clock.advance_to(snapshot.timestamp);
                    match engine.submit(snapshot).await {
                        Ok(()) => summary.snapshots += 1,
                        Err(EngineError::EmptySymbol) => {
                            warn!("Skipping snapshot without a symbol");
                            summary.skipped += 1;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        summary.shutdown = engine.shutdown().await;
        summary.performance = performance_handle
            .await
            .map_err(|e| RunError::Performance(e.to_string()))?;
        summary.dispatch = dispatch_handle
            .await
            .map_err(|e| RunError::Dispatcher(e.to_string()))?;

        info!(
            "Run finished: {} snapshots, {} closed ({:.1}% won, {:+.2}% total), {} events dispatched, {} dropped",
            summary.snapshots,
            summary.performance.closed,
            summary.performance.win_rate(),
            summary.performance.total_pnl_pct,
            summary.dispatch.delivered,
            summary.dispatch.dropped
        );
        Ok(summary)
    }
}

/// Record every event, then pass it on to the dispatcher unchanged.
/// Ends when the engine drops its sender, which in turn ends the dispatcher.
fn spawn_performance_tap(
    mut events: mpsc::UnboundedReceiver<LifecycleEvent>,
    dispatch: mpsc::UnboundedSender<LifecycleEvent>,
) -> JoinHandle<PerformanceStats> {
    tokio::spawn(async move {
        let mut stats = PerformanceStats::new();
        while let Some(event) = events.recv().await {
            stats.record(&event);
            if dispatch.send(event).is_err() {
                warn!("Event dispatcher stopped before the engine");
            }
        }
        stats
    })
}
