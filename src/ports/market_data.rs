use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::MarketSnapshot;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed snapshot on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Feed already started")]
    AlreadyStarted,
}

/// Source of market snapshots, all symbols interleaved in arrival order
#[async_trait]
pub trait SnapshotFeed: Send {
    /// Begin producing snapshots. The channel closes when the feed ends.
    async fn start(&mut self) -> Result<mpsc::Receiver<MarketSnapshot>, FeedError>;
}
