//! JSON-file outcome log, stored as a single pretty-printed array on disk.
//!
//! Each append reads the whole array, pushes, and rewrites via a temp file
//! plus rename, all under one mutex so concurrent appends are never lost.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::traits::{LogEntry, LogRecord, OutcomeLog};
use crate::error::LogStoreError;

/// File-backed outcome log.
pub struct JsonFileLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Load the current array. A missing or empty file is an empty log; a
    /// file that is not an entry array is refused rather than overwritten.
    async fn load(&self) -> Result<Vec<LogEntry>, LogStoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| LogStoreError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl OutcomeLog for JsonFileLog {
    async fn append(&self, record: LogRecord) -> Result<LogEntry, LogStoreError> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        let entry = record.stamp(Utc::now());
        entries.push(entry.clone());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(&entries)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), entries = entries.len(), "Outcome log appended");
        Ok(entry)
    }

    async fn read_all(&self) -> Result<Vec<LogEntry>, LogStoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}
