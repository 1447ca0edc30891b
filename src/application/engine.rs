//! Signal Engine
//!
//! Registry of per-symbol workers. Each symbol gets its own task owning a
//! `SymbolSession`; snapshots reach it over a bounded channel so a symbol's
//! snapshots are applied strictly in arrival order while distinct symbols
//! progress independently. The worker also runs the staleness watchdog at
//! the snapshot cadence, but only once its queue has drained.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::application::pipeline::SignalPipeline;
use crate::application::session::{SessionStats, SymbolSession};
use crate::config::Config;
use crate::domain::{
    ActivePosition, CloseReason, DailyStats, ExitConfig, FullyClosed, LifecycleEvent,
    MarketSnapshot, RiskManager,
};
use crate::ports::Clock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-symbol snapshot queue depth
    pub channel_capacity: usize,
    /// Consecutive qualifying snapshots required before admission
    pub entry_persistence_samples: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            entry_persistence_samples: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Worker for {0} is no longer running")]
    WorkerGone(String),

    #[error("Snapshot has an empty symbol")]
    EmptySymbol,
}

enum WorkerCommand {
    Snapshot(MarketSnapshot),
    Position(oneshot::Sender<Option<ActivePosition>>),
    Shutdown(oneshot::Sender<WorkerReport>),
}

/// What a worker hands back when it stops
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub symbol: String,
    pub forced_close: Option<FullyClosed>,
    pub stats: SessionStats,
}

#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    pub workers: Vec<WorkerReport>,
    pub daily: Option<DailyStats>,
}

impl ShutdownReport {
    pub fn forced_closes(&self) -> impl Iterator<Item = &FullyClosed> {
        self.workers.iter().filter_map(|w| w.forced_close.as_ref())
    }
}

struct WorkerHandle {
    tx: mpsc::Sender<WorkerCommand>,
    join: JoinHandle<()>,
}

pub struct SignalEngine {
    workers: HashMap<String, WorkerHandle>,
    pipeline: Arc<SignalPipeline>,
    risk: Arc<Mutex<RiskManager>>,
    clock: Arc<dyn Clock>,
    exit: ExitConfig,
    config: EngineConfig,
    events: mpsc::UnboundedSender<LifecycleEvent>,
}

impl SignalEngine {
    pub fn new(
        config: &Config,
        clock: Arc<dyn Clock>,
        events: mpsc::UnboundedSender<LifecycleEvent>,
    ) -> Self {
        Self {
            workers: HashMap::new(),
            pipeline: Arc::new(SignalPipeline::from_config(config)),
            risk: Arc::new(Mutex::new(RiskManager::new(config.admission.clone()))),
            clock,
            exit: config.exit.clone(),
            config: config.engine.clone(),
            events,
        }
    }

    /// Route a snapshot to its symbol's worker, starting the worker on first sight.
    /// Waits when that symbol's queue is full.
    pub async fn submit(&mut self, snapshot: MarketSnapshot) -> Result<(), EngineError> {
        if snapshot.symbol.is_empty() {
            return Err(EngineError::EmptySymbol);
        }

        let symbol = snapshot.symbol.clone();
        let tx = self.worker(&symbol);
        tx.send(WorkerCommand::Snapshot(snapshot))
            .await
            .map_err(|_| EngineError::WorkerGone(symbol))
    }

    fn worker(&mut self, symbol: &str) -> mpsc::Sender<WorkerCommand> {
        if let Some(handle) = self.workers.get(symbol) {
            return handle.tx.clone();
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let session = SymbolSession::new(
            symbol,
            Arc::clone(&self.pipeline),
            Arc::clone(&self.risk),
            self.exit.clone(),
            self.config.entry_persistence_samples,
        );
        let join = tokio::spawn(run_worker(
            session,
            rx,
            Arc::clone(&self.clock),
            self.events.clone(),
            Duration::from_millis(self.exit.snapshot_cadence_ms.max(1)),
        ));
        debug!("Started worker for {}", symbol);

        self.workers.insert(
            symbol.to_string(),
            WorkerHandle {
                tx: tx.clone(),
                join,
            },
        );
        tx
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<_> = self.workers.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Current open position of every symbol, queued behind pending snapshots
    pub async fn open_positions(&self) -> Vec<ActivePosition> {
        let mut positions = Vec::new();
        for (symbol, handle) in &self.workers {
            let (reply, rx) = oneshot::channel();
            if handle.tx.send(WorkerCommand::Position(reply)).await.is_err() {
                warn!("Worker for {} did not answer position query", symbol);
                continue;
            }
            if let Ok(Some(position)) = rx.await {
                positions.push(position);
            }
        }
        positions.sort_by(|a, b| a.signal.symbol.cmp(&b.signal.symbol));
        positions
    }

    pub fn daily_stats(&self) -> DailyStats {
        self.risk
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .daily_stats()
    }

    /// Stop every worker. Open positions are force-closed and their close
    /// events are emitted before this returns.
    pub async fn shutdown(mut self) -> ShutdownReport {
        info!("Shutting down {} symbol workers", self.workers.len());

        let mut report = ShutdownReport::default();
        for (symbol, handle) in self.workers.drain() {
            let (reply, rx) = oneshot::channel();
            if handle.tx.send(WorkerCommand::Shutdown(reply)).await.is_err() {
                error!("Worker for {} exited before shutdown", symbol);
                continue;
            }
            match rx.await {
                Ok(worker) => report.workers.push(worker),
                Err(_) => error!("Worker for {} dropped its shutdown reply", symbol),
            }
            if let Err(e) = handle.join.await {
                error!("Worker for {} panicked: {}", symbol, e);
            }
        }

        report.workers.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        report.daily = Some(self.daily_stats());
        let forced = report.forced_closes().count();
        if forced > 0 {
            warn!("{} open positions force-closed for reconciliation", forced);
        }
        report
    }
}

async fn run_worker(
    mut session: SymbolSession,
    mut rx: mpsc::Receiver<WorkerCommand>,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<LifecycleEvent>,
    cadence: Duration,
) {
    let mut watchdog = tokio::time::interval(cadence);
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            command = rx.recv() => match command {
                Some(WorkerCommand::Snapshot(snapshot)) => {
                    for event in session.on_snapshot(&snapshot, clock.now_ms()) {
                        emit(&events, event);
                    }
                }
                Some(WorkerCommand::Position(reply)) => {
                    let _ = reply.send(session.position().cloned());
                }
                Some(WorkerCommand::Shutdown(reply)) => {
                    let forced = session.force_close(CloseReason::Shutdown, clock.now_ms());
                    let forced_close = forced.as_ref().and_then(|e| e.as_fully_closed()).cloned();
                    if let Some(event) = forced {
                        emit(&events, event);
                    }
                    let _ = reply.send(WorkerReport {
                        symbol: session.symbol().to_string(),
                        forced_close,
                        stats: session.stats().clone(),
                    });
                    break;
                }
                None => {
                    if let Some(event) = session.force_close(CloseReason::Shutdown, clock.now_ms()) {
                        emit(&events, event);
                    }
                    break;
                }
            },
            _ = watchdog.tick() => {
                if let Some(event) = session.on_watchdog(clock.now_ms()) {
                    emit(&events, event);
                }
            }
        }
    }
    debug!("Worker for {} stopped", session.symbol());
}

fn emit(events: &mpsc::UnboundedSender<LifecycleEvent>, event: LifecycleEvent) {
    if let Err(e) = events.send(event) {
        error!(
            "Dispatcher gone, dropped {} event for {}",
            e.0.kind(),
            e.0.symbol()
        );
    }
}
