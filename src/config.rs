//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Default outcome log location, read by the analytics dashboard.
pub const DEFAULT_LOG_PATH: &str = "sent_responses_log.json";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Temperature for the classification call.
    pub classify_temperature: f32,
    /// Temperature for reply generation.
    pub reply_temperature: f32,
    /// Bound on every model call.
    pub llm_timeout: Duration,
    /// Bound on every transport send.
    pub send_timeout: Duration,
    /// Bound on every ticket creation.
    pub ticket_timeout: Duration,
    /// Maximum emails processed concurrently.
    pub max_workers: usize,
    /// Path of the JSON outcome log.
    pub log_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classify_temperature: 0.0,
            reply_temperature: 0.0,
            llm_timeout: Duration::from_secs(30),
            send_timeout: Duration::from_secs(20),
            ticket_timeout: Duration::from_secs(15),
            max_workers: 4,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

impl PipelineConfig {
    /// Build config from `TRIAGE_*` environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            classify_temperature: env_parse("TRIAGE_CLASSIFY_TEMPERATURE")
                .unwrap_or(defaults.classify_temperature),
            reply_temperature: env_parse("TRIAGE_REPLY_TEMPERATURE")
                .unwrap_or(defaults.reply_temperature),
            llm_timeout: env_parse("TRIAGE_LLM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.llm_timeout),
            send_timeout: env_parse("TRIAGE_SEND_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.send_timeout),
            ticket_timeout: env_parse("TRIAGE_TICKET_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.ticket_timeout),
            max_workers: env_parse::<usize>("TRIAGE_MAX_WORKERS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_workers),
            log_path: std::env::var("TRIAGE_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_path),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
