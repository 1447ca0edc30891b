//! Append-only JSON-lines event journal

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::LifecycleEvent;
use crate::ports::{EventSink, SinkError};

/// Writes each lifecycle event as one JSON object per line
#[derive(Debug)]
pub struct JsonlJournalSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlJournalSink {
    /// Open (or create) the journal for appending, creating parent directories
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        info!("Journaling lifecycle events to {}", path.display());

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSink for JsonlJournalSink {
    fn name(&self) -> String {
        format!("journal:{}", self.path.display())
    }

    async fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
