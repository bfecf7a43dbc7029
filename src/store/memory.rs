//! In-memory outcome log, for tests and dry runs.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::traits::{LogEntry, LogRecord, OutcomeLog};
use crate::error::LogStoreError;

#[derive(Default)]
pub struct MemoryLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeLog for MemoryLog {
    async fn append(&self, record: LogRecord) -> Result<LogEntry, LogStoreError> {
        let mut entries = self.entries.write().await;
        let entry = record.stamp(Utc::now());
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn read_all(&self) -> Result<Vec<LogEntry>, LogStoreError> {
        Ok(self.entries.read().await.clone())
    }
}
