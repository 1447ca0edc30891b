use async_trait::async_trait;
use thiserror::Error;

use crate::domain::LifecycleEvent;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for lifecycle events (persistence, notifications)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> String;

    async fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError>;
}
