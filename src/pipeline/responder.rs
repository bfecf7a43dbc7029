//! Reply generation with template fallback.
//!
//! `generate` never fails: a backend error or an empty completion is
//! replaced by a fixed per-category template.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::llm::failure;
use crate::llm::provider::{LlmProvider, invoke};
use crate::pipeline::types::{Category, ValidEmail};

/// Seam for reply generation so the pipeline can run against stubs.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Reply text for `email`; `fallback` is returned verbatim when the
    /// backend fails or produces nothing.
    async fn generate(&self, email: &ValidEmail, category: Category, fallback: &str) -> String;
}

/// Fixed reply used when generation fails. `Other` doubles as the catch-all.
pub fn fallback_template(category: Category) -> &'static str {
    match category {
        Category::Complaint => {
            "We're sorry to hear about the issue. We've shared your message with our team and will follow up soon."
        }
        Category::Inquiry => {
            "Thanks for reaching out! We'll get back to you shortly with more information."
        }
        Category::Feedback => {
            "We truly appreciate your kind words. Thank you for letting us know!"
        }
        Category::SupportRequest => {
            "Thanks for contacting us. Our team is looking into your issue and will follow up shortly."
        }
        Category::Other => "Thanks for your message. We'll review it and respond if needed.",
    }
}

/// LLM-backed reply generator.
pub struct Responder {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    timeout: Duration,
}

impl Responder {
    pub fn new(llm: Arc<dyn LlmProvider>, temperature: f32, timeout: Duration) -> Self {
        Self {
            llm,
            temperature,
            timeout,
        }
    }
}

#[async_trait]
impl ReplyGenerator for Responder {
    async fn generate(&self, email: &ValidEmail, category: Category, fallback: &str) -> String {
        let prompt = build_reply_prompt(email, category);

        match invoke(self.llm.as_ref(), &prompt, self.temperature, self.timeout).await {
            Ok(text) if !text.is_empty() => {
                info!(email_id = %email.id, "Generated custom reply");
                text
            }
            Ok(_) => {
                info!(email_id = %email.id, "Model returned no content, using fallback reply");
                fallback.to_string()
            }
            Err(e) => {
                failure::report("generation", &email.id, &email.subject, &e);
                info!(email_id = %email.id, "Using fallback reply after model failure");
                fallback.to_string()
            }
        }
    }
}

/// Build the category-conditioned reply prompt.
pub fn build_reply_prompt(email: &ValidEmail, category: Category) -> String {
    format!(
        "You are a professional customer service assistant. Based on the classification of the email, \
         generate a short and polite response.\n\n\
         Classification: {category}\n\n\
         Email content:\n\
         Subject: {subject}\n\
         Body: {body}\n\n\
         Guidelines:\n\
         - Keep the tone friendly and professional\n\
         - Address the customer's concern based on the classification\n\
         - Reply directly to the customer (no AI disclaimers)\n\
         - Keep it under 4 sentences\n\
         - Do not repeat the original message\n\
         - End with a polite closing signed by the service team, such as \"Customer Service Team\"\n\
         - Use proper grammar, spelling, and punctuation\n\n\
         Only output the message body as plain text.",
        category = category.as_str(),
        subject = email.subject,
        body = email.body,
    )
}
