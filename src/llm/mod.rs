//! LLM integration.
//!
//! The pipeline only needs `invoke(prompt, temperature) -> text | failure`.
//! `OpenAiProvider` implements `LlmProvider` over any OpenAI-compatible
//! chat-completions endpoint.

pub mod failure;
pub mod openai;
pub mod provider;

pub use failure::ExternalErrorKind;
pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    /// Build config from `OPENAI_API_KEY`, `TRIAGE_MODEL` and `TRIAGE_LLM_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            model: std::env::var("TRIAGE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("TRIAGE_LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Create an LLM provider from configuration.
///
/// `request_timeout` bounds each HTTP request to the backend.
pub fn create_provider(config: &LlmConfig, request_timeout: Duration) -> Arc<dyn LlmProvider> {
    tracing::info!("Using OpenAI-compatible backend (model: {})", config.model);
    Arc::new(OpenAiProvider::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
        request_timeout,
    ))
}
