//! Shared types for the triage pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PipelineError;
use crate::pipeline::state::PipelineStage;

/// Recipient used when an email carries no `from` address.
pub const DEFAULT_RECIPIENT: &str = "no-reply@example.com";

/// Placeholder id for inputs that are not email records at all.
pub const UNKNOWN_EMAIL_ID: &str = "unknown";

// ── Category ────────────────────────────────────────────────────────

/// Closed set of intent labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Complaint,
    Inquiry,
    Feedback,
    SupportRequest,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Complaint,
        Self::Inquiry,
        Self::Feedback,
        Self::SupportRequest,
        Self::Other,
    ];

    /// Canonical lowercase spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complaint => "complaint",
            Self::Inquiry => "inquiry",
            Self::Feedback => "feedback",
            Self::SupportRequest => "support_request",
            Self::Other => "other",
        }
    }

    /// Case-insensitive match against the canonical spellings after trimming.
    /// Anything else is `None`; there is no default bucket.
    pub fn parse(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Email ───────────────────────────────────────────────────────────

/// An inbound email after identifier backfill.
///
/// Everything except `id` is taken from the input as-is; a field that is
/// missing or not a string is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub id: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Email {
    /// Build from a JSON record, using `id` as the already-normalized identifier.
    pub fn from_record(record: &Map<String, Value>, id: String) -> Self {
        let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            id,
            from: text("from"),
            subject: text("subject"),
            body: text("body"),
            timestamp: text("timestamp"),
        }
    }

    /// Reply recipient: the sender, or the no-reply fallback.
    pub fn recipient(&self) -> &str {
        self.from.as_deref().unwrap_or(DEFAULT_RECIPIENT)
    }
}

/// An email that passed validation: subject and body are present and non-blank.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidEmail {
    pub id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

// ── Result ──────────────────────────────────────────────────────────

/// Terminal status of one email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Success,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one pipeline run for one email. Created once, never mutated.
///
/// `response_sent` is derived from `status` in both constructors, so it is
/// true exactly when the status is success.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub email_id: String,
    pub original_email: Value,
    pub classification: Option<Category>,
    pub response_sent: bool,
    pub status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Lifecycle stage the email ended in.
    #[serde(skip)]
    pub stage: PipelineStage,
}

impl ProcessingResult {
    pub fn success(
        email_id: String,
        original_email: Value,
        classification: Category,
        stage: PipelineStage,
    ) -> Self {
        Self {
            email_id,
            original_email,
            classification: Some(classification),
            response_sent: true,
            status: ProcessingStatus::Success,
            error_message: None,
            stage,
        }
    }

    pub fn failure(
        email_id: String,
        original_email: Value,
        classification: Option<Category>,
        error: &PipelineError,
        stage: PipelineStage,
    ) -> Self {
        Self {
            email_id,
            original_email,
            classification,
            response_sent: false,
            status: ProcessingStatus::Error,
            error_message: Some(error.to_string()),
            stage,
        }
    }
}

/// JSON type name, for "expected object, got ..." messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a non-record input for `original_email`, capped at 100 chars.
pub fn preview_input(value: &Value) -> Value {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.chars().count() > 100 {
        let head: String = rendered.chars().take(100).collect();
        Value::String(format!("{head}..."))
    } else {
        Value::String(rendered)
    }
}
