//! Outcome log interface and its persisted entry schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LogStoreError;
use crate::pipeline::types::{Category, ProcessingStatus};

/// One handler invocation, as persisted for the analytics dashboard.
///
/// Field names are the on-disk schema and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub email_id: String,
    pub recipient: String,
    pub classification: String,
    /// ISO-8601 UTC with a `Z` suffix, captured when the entry is appended.
    pub timestamp: String,
    pub response: String,
    pub status: ProcessingStatus,
}

/// An outcome waiting to be logged. The store stamps it when it appends,
/// so timestamps follow append order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub email_id: String,
    pub recipient: String,
    pub category: Category,
    pub reply: String,
    pub status: ProcessingStatus,
}

impl LogRecord {
    pub fn new(
        email_id: &str,
        recipient: &str,
        category: Category,
        reply: &str,
        status: ProcessingStatus,
    ) -> Self {
        Self {
            email_id: email_id.to_string(),
            recipient: recipient.to_string(),
            category,
            reply: reply.to_string(),
            status,
        }
    }

    /// Build the persisted entry logged at `at`.
    pub fn stamp(self, at: DateTime<Utc>) -> LogEntry {
        let timestamp = format_timestamp(at);
        LogEntry {
            email_id: self.email_id,
            recipient: self.recipient,
            classification: self.category.as_str().to_string(),
            response: format!("{}\n\n[Sent at {timestamp}]", self.reply),
            timestamp,
            status: self.status,
        }
    }
}

/// `2025-03-15T10:00:00.123456Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Append-only outcome log.
///
/// Implementations serialize appends: concurrent callers never lose or
/// interleave entries, and read order is append order.
#[async_trait]
pub trait OutcomeLog: Send + Sync {
    /// Stamp `record` and append it. Never rewrites or drops earlier entries.
    async fn append(&self, record: LogRecord) -> Result<LogEntry, LogStoreError>;

    /// Read the whole store in append order.
    async fn read_all(&self) -> Result<Vec<LogEntry>, LogStoreError>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn entry_serializes_persisted_schema() {
        let at = Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap();
        let entry = LogRecord::new(
            "test001",
            "test@example.com",
            Category::SupportRequest,
            "We're on it.",
            ProcessingStatus::Success,
        )
        .stamp(at);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "email_id": "test001",
                "recipient": "test@example.com",
                "classification": "support_request",
                "timestamp": "2025-03-15T10:00:00.000000Z",
                "response": "We're on it.\n\n[Sent at 2025-03-15T10:00:00.000000Z]",
                "status": "success"
            })
        );
    }

    #[test]
    fn timestamp_has_z_suffix() {
        assert!(format_timestamp(Utc::now()).ends_with('Z'));
    }
}
