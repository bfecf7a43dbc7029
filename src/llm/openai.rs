//! OpenAI-compatible chat-completions backend.
//!
//! Works against any endpoint that accepts the OpenAI request format; the
//! base URL is configurable.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
};

const PROVIDER: &str = "openai";

/// LLM provider speaking the OpenAI chat-completions protocol.
pub struct OpenAiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    /// Per-request HTTP deadline.
    request_timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            request_timeout,
        }
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatRequestBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
        };

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                429 => {
                    warn!(retry_after = ?retry_after, "Model backend rate limited");
                    LlmError::RateLimited {
                        provider: PROVIDER.to_string(),
                        retry_after,
                    }
                }
                401 | 403 => LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                },
                _ => LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("HTTP {status}: {text}"),
                },
            });
        }

        let parsed: ChatResponseBody =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("failed to parse response: {e}"),
                })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "response contained no choices".to_string(),
            })?;

        let usage = parsed.usage.unwrap_or(Usage {
            prompt_tokens: 0,
            completion_tokens: 0,
        });

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            response_id: parsed.id,
        })
    }
}

fn map_transport_error(e: reqwest::Error, request_timeout: Duration) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout {
            provider: PROVIDER.to_string(),
            after: request_timeout,
        }
    } else if e.is_connect() {
        LlmError::Connection {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        }
    }
}
