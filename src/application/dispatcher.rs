//! Event Dispatcher
//!
//! Delivers lifecycle events to every configured sink out of band. A failed
//! publish is retried with exponential backoff (base, 2×base, 4×base, ...)
//! and dropped with an error log once retries run out. Tracker state is
//! never touched from here.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::domain::LifecycleEvent;
use crate::ports::EventSink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 200,
        }
    }
}

impl DispatchConfig {
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(2u64.saturating_pow(attempt)))
    }
}

/// Delivery totals across all sinks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchStats {
    pub received: u64,
    pub delivered: u64,
    pub retries: u64,
    pub dropped: u64,
}

pub struct EventDispatcher {
    sinks: Vec<Arc<dyn EventSink>>,
    config: DispatchConfig,
    stats: DispatchStats,
}

impl EventDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            sinks: Vec::new(),
            config,
            stats: DispatchStats::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Drain `rx` until every sender is dropped, then return the totals
    pub fn spawn(mut self, mut rx: mpsc::UnboundedReceiver<LifecycleEvent>) -> JoinHandle<DispatchStats> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.dispatch(&event).await;
            }
            debug!("Event channel closed, dispatcher stopping");
            self.stats
        })
    }

    pub async fn dispatch(&mut self, event: &LifecycleEvent) {
        self.stats.received += 1;
        for sink in &self.sinks {
            let mut attempt = 0;
            loop {
                match sink.publish(event).await {
                    Ok(()) => {
                        self.stats.delivered += 1;
                        break;
                    }
                    Err(e) if attempt < self.config.max_retries => {
                        let backoff = self.config.backoff(attempt);
                        warn!(
                            "Sink {} failed on {} for {}: {} (retry {}/{} in {:?})",
                            sink.name(),
                            event.kind(),
                            event.symbol(),
                            e,
                            attempt + 1,
                            self.config.max_retries,
                            backoff
                        );
                        self.stats.retries += 1;
                        attempt += 1;
                        tokio::time::sleep(backoff).await;
                    }
                    Err(e) => {
                        error!(
                            "Sink {} dropped {} for {} after {} attempts: {}",
                            sink.name(),
                            event.kind(),
                            event.symbol(),
                            attempt + 1,
                            e
                        );
                        self.stats.dropped += 1;
                        break;
                    }
                }
            }
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}
