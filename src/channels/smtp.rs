//! SMTP transport via lettre (STARTTLS relay).

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, Transport as _};

use crate::channels::Transport;
use crate::error::ChannelError;

const CHANNEL: &str = "smtp";

// ── Configuration ───────────────────────────────────────────────────

/// SMTP configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub timeout: Duration,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.mailtrap.io".to_string(),
            port: 2525,
            username: String::new(),
            password: String::new(),
            from_address: "noreply@example.com".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl SmtpConfig {
    /// Build config from `SMTP_HOST`, `SMTP_PORT`, `EMAIL_USER`, `EMAIL_PASS`
    /// and `EMAIL_FROM_ADDRESS`.
    pub fn from_env(timeout: Duration) -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("SMTP_HOST").unwrap_or(defaults.host),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            username: std::env::var("EMAIL_USER").unwrap_or_default(),
            password: std::env::var("EMAIL_PASS").unwrap_or_default(),
            from_address: std::env::var("EMAIL_FROM_ADDRESS").unwrap_or(defaults.from_address),
            timeout,
        }
    }
}

// ── Transport ───────────────────────────────────────────────────────

/// Sends replies through an SMTP relay.
pub struct SmtpTransport {
    config: SmtpConfig,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Build the outbound message.
    pub fn build_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Message, ChannelError> {
        let from: Mailbox = parse_mailbox(&self.config.from_address)?;
        let to: Mailbox = parse_mailbox(recipient)?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL.into(),
                reason: format!("Failed to build email: {e}"),
            })
    }

    fn send_blocking(config: &SmtpConfig, message: &Message) -> Result<(), ChannelError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = lettre::SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL.into(),
                reason: format!("SMTP relay error: {e}"),
            })?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(config.timeout))
            .build();

        transport
            .send(message)
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL.into(),
                reason: format!("SMTP send failed: {e}"),
            })?;

        Ok(())
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn send(
        &self,
        email_id: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ChannelError> {
        let message = self.build_message(recipient, subject, body)?;
        let config = self.config.clone();

        // lettre's SmtpTransport is blocking.
        tokio::task::spawn_blocking(move || Self::send_blocking(&config, &message))
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL.into(),
                reason: format!("send task failed: {e}"),
            })??;

        tracing::info!(email_id = %email_id, "Email sent to {recipient}");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ChannelError> {
    address.parse().map_err(|e| ChannelError::InvalidAddress {
        address: address.to_string(),
        reason: format!("{e}"),
    })
}
