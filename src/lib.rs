//! Email Triage: classify inbound customer email and send the right reply.

pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod store;
pub mod tickets;
