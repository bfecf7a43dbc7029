//! Persistence layer for the append-only outcome log.

pub mod json_log;
pub mod memory;
pub mod traits;

pub use json_log::JsonFileLog;
pub use memory::MemoryLog;
pub use traits::{LogEntry, LogRecord, OutcomeLog};
