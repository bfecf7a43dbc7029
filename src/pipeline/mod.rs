//! Email triage pipeline.
//!
//! Every inbound email flows through:
//! 1. `identity::normalize_id()`: id backfill
//! 2. `validate::validate()`: required fields
//! 3. `EmailClassifier::classify()`: LLM intent label, fail-closed
//! 4. `Dispatcher::handle()`: reply then send, gated side effect, outcome log
//!
//! `EmailPipeline` drives single emails and bounded-concurrency batches.

pub mod classifier;
pub mod dispatch;
pub mod identity;
pub mod processor;
pub mod responder;
pub mod state;
pub mod types;
pub mod validate;

pub use processor::{EmailPipeline, PipelineDeps};
pub use types::{Category, Email, ProcessingResult, ProcessingStatus};
