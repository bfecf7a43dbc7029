//! Intent classification.
//!
//! Fail-closed: any backend failure, unparseable output, or label outside
//! the closed category set yields `None`. Nothing is ever defaulted to
//! `other`; that bucket is only reached when the model explicitly says so.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm::failure;
use crate::llm::provider::{LlmProvider, invoke};
use crate::pipeline::types::{Category, ValidEmail};

/// Key spellings checked, in order, for the category value.
const CATEGORY_KEYS: [&str; 4] = ["classification", "Classification", "category", "Category"];

/// Seam for the classification step so the pipeline can run against stubs.
#[async_trait]
pub trait EmailClassifier: Send + Sync {
    /// Canonical category, or `None` on any failure.
    async fn classify(&self, email: &ValidEmail) -> Option<Category>;
}

/// LLM-backed classifier using a few-shot prompt.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    timeout: Duration,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>, temperature: f32, timeout: Duration) -> Self {
        Self {
            llm,
            temperature,
            timeout,
        }
    }
}

#[async_trait]
impl EmailClassifier for Classifier {
    async fn classify(&self, email: &ValidEmail) -> Option<Category> {
        let prompt = build_classification_prompt(email);

        let raw = match invoke(self.llm.as_ref(), &prompt, self.temperature, self.timeout).await {
            Ok(raw) => raw,
            Err(e) => {
                failure::report("classification", &email.id, &email.subject, &e);
                return None;
            }
        };

        debug!(email_id = %email.id, raw = %raw, "Raw classifier output");

        match parse_classification(&raw) {
            Ok(category) => {
                info!(
                    email_id = %email.id,
                    classification = category.as_str(),
                    "Valid classification"
                );
                Some(category)
            }
            Err(reason) => {
                warn!(email_id = %email.id, raw = %raw, reason = %reason, "Classification rejected");
                None
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Build the few-shot classification prompt. Deterministic for a given email.
pub fn build_classification_prompt(email: &ValidEmail) -> String {
    format!(
        "You are a smart and reliable assistant tasked with classifying customer emails into one of five categories:\n\
         - complaint: expressing dissatisfaction, anger, or frustration with a product, service, or experience.\n\
         - inquiry: requesting specific information or asking a question about a product, service, or policy.\n\
         - feedback: offering praise, general impressions, or constructive criticism without a request.\n\
         - support_request: seeking help with a technical issue, error, or usage problem.\n\
         - other: everything else that does not fit the above, including proposals, marketing, etc.\n\n\
         Use only the content of the email to determine its intent. Tone and language are important.\n\n\
         Here are examples:\n\n\
         ---\n\
         Subject: Delayed order and poor packaging\n\
         Body: I'm extremely disappointed. My package arrived a week late and the box was crushed. I expect better.\n\
         Output: {{ \"category\": \"complaint\" }}\n\n\
         ---\n\
         Subject: Clarification on billing cycle\n\
         Body: Hi, could you explain how often I'm billed for the premium subscription? Monthly or yearly?\n\
         Output: {{ \"category\": \"inquiry\" }}\n\n\
         ---\n\
         Subject: Great experience with your chat support\n\
         Body: Just wanted to say your support rep was amazing. Fast, friendly, and fixed everything!\n\
         Output: {{ \"category\": \"feedback\" }}\n\n\
         ---\n\
         Subject: Can't reset my password\n\
         Body: I tried resetting my password but I'm not receiving any reset email. Can you help?\n\
         Output: {{ \"category\": \"support_request\" }}\n\n\
         ---\n\
         Subject: Collaboration proposal\n\
         Body: We'd love to discuss a strategic partnership with your company. Is next week good for a meeting?\n\
         Output: {{ \"category\": \"other\" }}\n\n\
         ---\n\
         Now classify the following email.\n\n\
         Subject: {subject}\n\
         Body: {body}\n\n\
         Respond only with:\n\
         {{ \"category\": \"<complaint|inquiry|feedback|support_request|other>\" }}",
        subject = email.subject,
        body = email.body,
    )
}

// ── Response parsing ────────────────────────────────────────────────

/// Why raw classifier output was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("empty response")]
    Empty,
    #[error("not valid JSON: {0}")]
    NotJson(String),
    #[error("JSON is not an object")]
    NotObject,
    #[error("no category key (keys: {0:?})")]
    MissingKey(Vec<String>),
    #[error("unrecognized category '{0}'")]
    Unrecognized(String),
}

/// Parse raw model text into a canonical category.
pub fn parse_classification(raw: &str) -> Result<Category, ParseFailure> {
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let parsed: Value =
        serde_json::from_str(text).map_err(|e| ParseFailure::NotJson(e.to_string()))?;
    let object = parsed.as_object().ok_or(ParseFailure::NotObject)?;

    // First present key wins, even if its value is null.
    let value = CATEGORY_KEYS
        .iter()
        .find_map(|key| object.get(*key))
        .filter(|v| !v.is_null())
        .ok_or_else(|| ParseFailure::MissingKey(object.keys().cloned().collect()))?;

    let label = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Category::parse(&label).ok_or_else(|| ParseFailure::Unrecognized(label.trim().to_string()))
}

/// Remove a surrounding triple-backtick fence and an optional `json` tag.
fn strip_code_fence(text: &str) -> &str {
    const FENCE: &str = "```";

    if text.len() < 2 * FENCE.len() || !text.starts_with(FENCE) || !text.ends_with(FENCE) {
        return text;
    }

    let inner = text[FENCE.len()..text.len() - FENCE.len()].trim();
    match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => inner[4..].trim(),
        _ => inner,
    }
}
