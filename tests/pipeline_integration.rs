//! End-to-end tests for the triage pipeline.
//!
//! Each test wires the real classifier, responder, dispatcher and JSON log
//! around a scripted LLM, a recording transport and a recording ticket
//! client. No network or SMTP access.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use email_triage::channels::Transport;
use email_triage::config::PipelineConfig;
use email_triage::error::{ChannelError, LlmError, TicketError};
use email_triage::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use email_triage::pipeline::responder::fallback_template;
use email_triage::pipeline::{Category, EmailPipeline, PipelineDeps, ProcessingStatus};
use email_triage::store::{JsonFileLog, OutcomeLog};
use email_triage::tickets::{TicketClient, TicketPriority, TicketRequest};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Scripted LLM keyed on words in the email body.
///
/// Classification: "refund" → fenced complaint, "broken" → support_request,
/// "thanks" → feedback, "throttle" → rate limit, "weird" → unknown label,
/// anything else → inquiry. Replies fail when the body contains "offline".
struct ScriptedLlm;

impl ScriptedLlm {
    fn classify(body: &str) -> Result<String, LlmError> {
        let label = if body.contains("throttle") {
            return Err(LlmError::RateLimited {
                provider: "scripted".into(),
                retry_after: None,
            });
        } else if body.contains("refund") {
            return Ok("```json\n{\"category\": \"complaint\"}\n```".to_string());
        } else if body.contains("broken") {
            "support_request"
        } else if body.contains("thanks") {
            "feedback"
        } else if body.contains("weird") {
            "spam"
        } else {
            "inquiry"
        };
        Ok(format!("{{\"category\": \"{label}\"}}"))
    }

    fn reply(body: &str) -> Result<String, LlmError> {
        if body.contains("offline") {
            return Err(LlmError::Connection {
                provider: "scripted".into(),
                reason: "connection refused".into(),
            });
        }
        Ok("Thank you for contacting us.\nCustomer Service Team".to_string())
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let body = prompt
            .rsplit("Body: ")
            .next()
            .unwrap_or_default()
            .to_string();

        let content = if prompt.contains("Now classify the following email") {
            Self::classify(&body)?
        } else {
            Self::reply(&body)?
        };

        Ok(CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }
}

#[derive(Default)]
struct RecordingTransport {
    failing_recipient: Option<String>,
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(
        &self,
        _email_id: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ChannelError> {
        if self.failing_recipient.as_deref() == Some(recipient) {
            return Err(ChannelError::SendFailed {
                name: "recording".into(),
                reason: "Simulated SMTP error".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.into(), subject.into(), body.into()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingTickets {
    created: Mutex<Vec<TicketRequest>>,
}

#[async_trait]
impl TicketClient for RecordingTickets {
    async fn create_ticket(&self, request: &TicketRequest) -> Result<u64, TicketError> {
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        Ok(created.len() as u64)
    }
}

struct Harness {
    pipeline: Arc<EmailPipeline>,
    transport: Arc<RecordingTransport>,
    tickets: Arc<RecordingTickets>,
    log: Arc<JsonFileLog>,
    _dir: tempfile::TempDir,
}

fn harness(transport: RecordingTransport) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        log_path: dir.path().join("sent_responses_log.json"),
        max_workers: 3,
        ..Default::default()
    };

    let transport = Arc::new(transport);
    let tickets = Arc::new(RecordingTickets::default());
    let log = Arc::new(JsonFileLog::new(config.log_path.clone()));

    let deps = PipelineDeps::with_llm(
        Arc::new(ScriptedLlm),
        transport.clone(),
        Some(tickets.clone()),
        log.clone(),
        &config,
    );

    Harness {
        pipeline: Arc::new(EmailPipeline::new(deps, &config)),
        transport,
        tickets,
        log,
        _dir: dir,
    }
}

fn email(id: &str, from: &str, subject: &str, body: &str) -> Value {
    json!({
        "id": id,
        "from": from,
        "subject": subject,
        "body": body,
        "timestamp": "2024-03-15T10:30:00Z",
    })
}

#[tokio::test]
async fn mixed_batch_end_to_end() {
    let h = harness(RecordingTransport::default());
    let inputs = vec![
        email("001", "a@example.com", "Order issue", "I want a refund now"),
        email("002", "b@example.com", "Hours", "When are you open?"),
        email("003", "c@example.com", "Login", "The app is broken"),
        email("004", "d@example.com", "Kudos", "thanks for the help"),
        json!({"id": "005", "from": "e@example.com", "subject": "Empty"}),
        email("006", "f@example.com", "Odd", "something weird"),
    ];

    let results = tokio::time::timeout(TEST_TIMEOUT, h.pipeline.process_batch(inputs))
        .await
        .expect("batch hung");

    let summary: Vec<_> = results
        .iter()
        .map(|r| (r.email_id.as_str(), r.classification, r.status))
        .collect();
    assert_eq!(
        summary,
        [
            ("001", Some(Category::Complaint), ProcessingStatus::Success),
            ("002", Some(Category::Inquiry), ProcessingStatus::Success),
            ("003", Some(Category::SupportRequest), ProcessingStatus::Success),
            ("004", Some(Category::Feedback), ProcessingStatus::Success),
            ("005", None, ProcessingStatus::Error),
            ("006", None, ProcessingStatus::Error),
        ]
    );
    for result in &results {
        assert_eq!(result.response_sent, result.status.is_success());
    }

    // One log entry per handled email
    let entries = h.log.read_all().await.unwrap();
    let mut logged: Vec<_> = entries.iter().map(|e| e.email_id.clone()).collect();
    logged.sort();
    assert_eq!(logged, ["001", "002", "003", "004"]);

    // complaint, support_request, feedback each open a ticket; inquiry does not
    let tickets = h.tickets.created.lock().unwrap().clone();
    assert_eq!(tickets.len(), 3);
    let urgent: Vec<_> = tickets
        .iter()
        .filter(|t| t.priority == TicketPriority::Urgent)
        .map(|t| t.email_id.as_str())
        .collect();
    assert_eq!(urgent, ["001"]);

    assert_eq!(h.transport.sent.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn complaint_uses_complaint_subject() {
    let h = harness(RecordingTransport::default());
    h.pipeline
        .process(email("010", "a@example.com", "Order issue", "I want a refund"))
        .await;

    let sent = h.transport.sent.lock().unwrap().clone();
    assert_eq!(sent[0].0, "a@example.com");
    assert_eq!(sent[0].1, "Regarding Your Complaint");
    assert_eq!(sent[0].2, "Thank you for contacting us.\nCustomer Service Team");
}

#[tokio::test]
async fn rate_limited_classification_sends_nothing() {
    let h = harness(RecordingTransport::default());
    let result = h
        .pipeline
        .process(email("020", "a@example.com", "Hi", "please throttle me"))
        .await;

    assert_eq!(result.status, ProcessingStatus::Error);
    assert_eq!(result.classification, None);
    assert_eq!(result.error_message.as_deref(), Some("Email 020: classification failed"));
    assert!(h.transport.sent.lock().unwrap().is_empty());
    assert!(h.tickets.created.lock().unwrap().is_empty());
    assert!(h.log.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_label_is_not_defaulted_to_other() {
    let h = harness(RecordingTransport::default());
    let result = h
        .pipeline
        .process(email("030", "a@example.com", "Hm", "weird stuff"))
        .await;

    assert_eq!(result.classification, None);
    assert_eq!(result.status, ProcessingStatus::Error);
    assert!(h.transport.sent.lock().unwrap().is_empty());
    assert!(h.tickets.created.lock().unwrap().is_empty());
    assert!(h.log.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn generation_failure_sends_fallback_template() {
    let h = harness(RecordingTransport::default());
    let result = h
        .pipeline
        .process(email("040", "a@example.com", "Question", "are you offline?"))
        .await;

    assert_eq!(result.status, ProcessingStatus::Success);
    let sent = h.transport.sent.lock().unwrap().clone();
    assert_eq!(sent[0].2, fallback_template(Category::Inquiry));

    let entries = h.log.read_all().await.unwrap();
    assert!(entries[0].response.starts_with(fallback_template(Category::Inquiry)));
    assert!(entries[0].response.contains("\n\n[Sent at "));
}

#[tokio::test]
async fn failed_send_skips_ticket_and_logs_error() {
    let h = harness(RecordingTransport {
        failing_recipient: Some("angry@example.com".into()),
        ..Default::default()
    });

    let result = h
        .pipeline
        .process(email("050", "angry@example.com", "Order issue", "refund please"))
        .await;

    assert_eq!(result.status, ProcessingStatus::Error);
    assert_eq!(result.classification, Some(Category::Complaint));
    assert!(!result.response_sent);
    assert!(h.tickets.created.lock().unwrap().is_empty());

    let entries = h.log.read_all().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, ProcessingStatus::Error);
}

#[tokio::test]
async fn outcome_log_file_matches_dashboard_schema() {
    let h = harness(RecordingTransport::default());
    h.pipeline
        .process(email("060", "a@example.com", "Hours", "When are you open?"))
        .await;

    let raw = std::fs::read_to_string(h.log.path()).unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    let entry = &value[0];
    for key in ["email_id", "recipient", "classification", "timestamp", "response", "status"] {
        assert!(entry.get(key).is_some(), "missing {key}");
    }
    assert_eq!(entry["classification"], "inquiry");
    assert_eq!(entry["status"], "success");
    assert!(entry["timestamp"].as_str().unwrap().ends_with('Z'));
}
