//! Outbound reply transport.

pub mod smtp;

pub use smtp::{SmtpConfig, SmtpTransport};

use async_trait::async_trait;

use crate::error::ChannelError;

/// Delivers a reply to a customer. Pure I/O, no business logic.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logs (e.g. "smtp").
    fn name(&self) -> &str;

    /// Send one reply. `email_id` is for logging only.
    async fn send(
        &self,
        email_id: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ChannelError>;
}
