//! Error types for the triage pipeline.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Could not connect to provider {provider}: {reason}")]
    Connection { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} timed out after {after:?}")]
    Timeout { provider: String, after: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Outbound transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Send on channel {name} timed out after {after:?}")]
    Timeout { name: String, after: Duration },
}

/// Ticketing errors. Never fatal to an email's result.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Ticket rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ticket creation timed out after {after:?}")]
    Timeout { after: Duration },
}

/// Outcome log store errors.
#[derive(Debug, thiserror::Error)]
pub enum LogStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log store at {path} is not a JSON array of entries: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons an email is ineligible for classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid email format: expected object, got {kind}")]
    NotRecord { kind: &'static str },

    #[error("Email {email_id}: missing or empty 'body' field")]
    MissingBody { email_id: String },

    #[error("Email {email_id}: missing or empty 'subject' field")]
    MissingSubject { email_id: String },
}

/// Per-email pipeline failures, rendered into `ProcessingResult::error_message`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Email {email_id}: classification failed")]
    ClassificationFailed { email_id: String },

    #[error("Email {email_id}: failed to send {category} response: {source}")]
    SendFailed {
        email_id: String,
        category: &'static str,
        #[source]
        source: ChannelError,
    },

    #[error("Email {email_id}: not processed, pipeline shutting down")]
    ShuttingDown { email_id: String },

    #[error("Email {email_id}: worker task failed: {reason}")]
    WorkerFailed { email_id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_body_message_names_the_field() {
        let err = ValidationError::MissingBody {
            email_id: "test002".into(),
        };
        assert_eq!(
            err.to_string(),
            "Email test002: missing or empty 'body' field"
        );
    }

    #[test]
    fn validation_error_is_transparent_in_pipeline_error() {
        let err: PipelineError = ValidationError::NotRecord { kind: "array" }.into();
        assert_eq!(
            err.to_string(),
            "Invalid email format: expected object, got array"
        );
    }

    #[test]
    fn send_failure_message_includes_reason() {
        let err = PipelineError::SendFailed {
            email_id: "42".into(),
            category: "complaint",
            source: ChannelError::SendFailed {
                name: "smtp".into(),
                reason: "connection refused".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("complaint"));
        assert!(msg.contains("connection refused"));
    }
}
