//! JSON-lines replay feed
//!
//! One `MarketSnapshot` per line, all symbols interleaved in the order they
//! should be applied. Blank lines and lines starting with `#` are ignored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::MarketSnapshot;
use crate::ports::{FeedError, SnapshotFeed};

#[derive(Debug)]
pub struct ReplayFeed {
    path: PathBuf,
    capacity: usize,
    skip_malformed: bool,
    started: bool,
}

impl ReplayFeed {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            capacity: 1024,
            skip_malformed: false,
            started: false,
        }
    }

    /// Channel depth between the reader and the consumer
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Log and skip lines that fail to parse instead of failing the replay
    pub fn skip_malformed(mut self, skip: bool) -> Self {
        self.skip_malformed = skip;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> Result<Vec<MarketSnapshot>, FeedError> {
        let mut snapshots = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match serde_json::from_str::<MarketSnapshot>(line) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) if self.skip_malformed => {
                    warn!("Skipping malformed snapshot on line {}: {}", idx + 1, e);
                }
                Err(e) => {
                    return Err(FeedError::Parse {
                        line: idx + 1,
                        source: e,
                    })
                }
            }
        }
        Ok(snapshots)
    }
}

#[async_trait]
impl SnapshotFeed for ReplayFeed {
    async fn start(&mut self) -> Result<mpsc::Receiver<MarketSnapshot>, FeedError> {
        if self.started {
            return Err(FeedError::AlreadyStarted);
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let snapshots = self.parse(&content)?;
        self.started = true;
        info!(
            "Replaying {} snapshots from {}",
            snapshots.len(),
            self.path.display()
        );

        let (tx, rx) = mpsc::channel(self.capacity);
        tokio::spawn(async move {
            for snapshot in snapshots {
                if tx.send(snapshot).await.is_err() {
                    // consumer went away (shutdown)
                    break;
                }
            }
        });
        Ok(rx)
    }
}
