//! Classification of model-backend failures for differentiated log messages.
//!
//! No retry happens here. Callers treat the call as failed and apply their
//! own fallback (absence for classification, a template for generation).

use serde::Serialize;
use tracing::error;

use crate::error::LlmError;

/// Coarse kind of an external-call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalErrorKind {
    RateLimited,
    ConnectionError,
    AuthError,
    Timeout,
    Unknown,
}

impl ExternalErrorKind {
    pub fn of(err: &LlmError) -> Self {
        match err {
            LlmError::RateLimited { .. } => Self::RateLimited,
            LlmError::Connection { .. } => Self::ConnectionError,
            LlmError::AuthFailed { .. } => Self::AuthError,
            LlmError::Timeout { .. } => Self::Timeout,
            LlmError::RequestFailed { .. } | LlmError::InvalidResponse { .. } => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ConnectionError => "connection_error",
            Self::AuthError => "auth_error",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ExternalErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable message for a failed model call on a given email.
pub fn describe(kind: ExternalErrorKind, email_id: &str, subject: &str, err: &LlmError) -> String {
    match kind {
        ExternalErrorKind::RateLimited => {
            format!("Rate limit exceeded while processing email {email_id}")
        }
        ExternalErrorKind::ConnectionError => {
            format!("Network error while contacting the model backend for email {email_id}")
        }
        ExternalErrorKind::AuthError => {
            "Authentication failed while accessing the model backend".to_string()
        }
        ExternalErrorKind::Timeout => format!("Model request timed out for email {email_id}"),
        ExternalErrorKind::Unknown => format!(
            "Unexpected model failure for email {email_id} (subject: '{subject}'): {err}"
        ),
    }
}

/// Log a failed model call and return its kind.
pub fn report(stage: &'static str, email_id: &str, subject: &str, err: &LlmError) -> ExternalErrorKind {
    let kind = ExternalErrorKind::of(err);
    error!(
        email_id = %email_id,
        stage,
        kind = kind.as_str(),
        "{}",
        describe(kind, email_id, subject, err)
    );
    kind
}
