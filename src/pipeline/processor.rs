//! Email processor. Runs each email through the full triage pipeline.
//!
//! Flow per email:
//! 1. Identity backfill → every email gets a digit-bearing id
//! 2. Validation → subject and body must be present
//! 3. Classification → fail-closed, no default category
//! 4. Dispatch → reply, send, gated side effect, log
//!
//! Every input yields exactly one `ProcessingResult`; nothing escapes as a
//! panic or error to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::channels::Transport;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::error::ValidationError;
use crate::llm::LlmProvider;
use crate::pipeline::classifier::{Classifier, EmailClassifier};
use crate::pipeline::dispatch::{Dispatcher, route_for};
use crate::pipeline::identity::normalize_id;
use crate::pipeline::responder::{ReplyGenerator, Responder};
use crate::pipeline::state::{Lifecycle, PipelineStage};
use crate::pipeline::types::{
    Email, ProcessingResult, ProcessingStatus, UNKNOWN_EMAIL_ID, json_kind, preview_input,
};
use crate::pipeline::validate::validate;
use crate::store::OutcomeLog;
use crate::tickets::TicketClient;

/// Collaborators injected into the pipeline.
pub struct PipelineDeps {
    pub classifier: Arc<dyn EmailClassifier>,
    pub responder: Arc<dyn ReplyGenerator>,
    pub transport: Arc<dyn Transport>,
    pub tickets: Option<Arc<dyn TicketClient>>,
    pub log: Arc<dyn OutcomeLog>,
}

impl PipelineDeps {
    /// Wire the LLM-backed classifier and responder around one provider.
    pub fn with_llm(
        llm: Arc<dyn LlmProvider>,
        transport: Arc<dyn Transport>,
        tickets: Option<Arc<dyn TicketClient>>,
        log: Arc<dyn OutcomeLog>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            classifier: Arc::new(Classifier::new(
                llm.clone(),
                config.classify_temperature,
                config.llm_timeout,
            )),
            responder: Arc::new(Responder::new(
                llm,
                config.reply_temperature,
                config.llm_timeout,
            )),
            transport,
            tickets,
            log,
        }
    }
}

/// The triage pipeline.
pub struct EmailPipeline {
    classifier: Arc<dyn EmailClassifier>,
    dispatcher: Dispatcher,
    max_workers: usize,
    shutting_down: AtomicBool,
}

impl EmailPipeline {
    pub fn new(deps: PipelineDeps, config: &PipelineConfig) -> Self {
        let dispatcher = Dispatcher::new(
            deps.responder,
            deps.transport,
            deps.tickets,
            deps.log,
            config.send_timeout,
            config.ticket_timeout,
        );

        Self {
            classifier: deps.classifier,
            dispatcher,
            max_workers: config.max_workers.max(1),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Stop starting new emails. Emails already in flight run to completion.
    pub fn shutdown(&self) {
        if !self.shutting_down.swap(true, Ordering::SeqCst) {
            info!("Pipeline shutdown requested");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Process a single raw input record.
    pub async fn process(&self, input: Value) -> ProcessingResult {
        let record = match with_normalized_id(input) {
            Value::Object(record) => record,
            other => {
                let err = PipelineError::from(ValidationError::NotRecord {
                    kind: json_kind(&other),
                });
                error!(error = %err, "Rejected non-record input");
                return ProcessingResult::failure(
                    UNKNOWN_EMAIL_ID.to_string(),
                    preview_input(&other),
                    None,
                    &err,
                    PipelineStage::Failed,
                );
            }
        };

        let id = normalize_id(record.get("id"));
        let email = Email::from_record(&record, id.clone());
        let original = Value::Object(record);

        if self.is_shutting_down() {
            let err = PipelineError::ShuttingDown { email_id: id.clone() };
            warn!(email_id = %id, "Skipping email, pipeline shutting down");
            return ProcessingResult::failure(id, original, None, &err, PipelineStage::Validating);
        }

        let mut lifecycle = Lifecycle::new(&id);
        info!(email_id = %id, "Processing email");

        let result = self.run(id, email, original, &mut lifecycle).await;
        debug!(
            email_id = %result.email_id,
            path = %lifecycle.path(),
            terminal = lifecycle.stage().is_terminal(),
            "Email lifecycle"
        );
        result
    }

    async fn run(
        &self,
        id: String,
        email: Email,
        original: Value,
        lifecycle: &mut Lifecycle,
    ) -> ProcessingResult {
        // Step 1: Validation
        let valid = match validate(&email) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(email_id = %id, error = %e, "Email failed validation");
                lifecycle.advance(PipelineStage::Failed);
                return ProcessingResult::failure(
                    id,
                    original,
                    None,
                    &PipelineError::from(e),
                    lifecycle.stage(),
                );
            }
        };

        // Step 2: Classification
        lifecycle.advance(PipelineStage::Classifying);
        let Some(category) = self.classifier.classify(&valid).await else {
            let err = PipelineError::ClassificationFailed { email_id: id.clone() };
            error!(email_id = %id, "Classification failed, email will not be handled");
            lifecycle.advance(PipelineStage::Failed);
            return ProcessingResult::failure(id, original, None, &err, lifecycle.stage());
        };

        // Step 3: Dispatch
        lifecycle.advance(PipelineStage::Handling);
        let route = route_for(category);
        let outcome = self.dispatcher.handle(&valid, &route, lifecycle).await;

        match (outcome.status, outcome.send_error) {
            (ProcessingStatus::Success, _) => {
                info!(email_id = %id, classification = category.as_str(), "Email processed");
                ProcessingResult::success(id, original, category, lifecycle.stage())
            }
            (ProcessingStatus::Error, send_error) => {
                let err = match send_error {
                    Some(source) => PipelineError::SendFailed {
                        email_id: id.clone(),
                        category: category.as_str(),
                        source,
                    },
                    None => PipelineError::WorkerFailed {
                        email_id: id.clone(),
                        reason: "handler reported failure without a cause".to_string(),
                    },
                };
                ProcessingResult::failure(id, original, Some(category), &err, lifecycle.stage())
            }
        }
    }

    /// Process a batch on at most `max_workers` concurrent tasks.
    ///
    /// Results come back in input order, one per input. Failures in one
    /// email never affect another.
    pub async fn process_batch(self: &Arc<Self>, inputs: Vec<Value>) -> Vec<ProcessingResult> {
        let total = inputs.len();
        info!(emails = total, max_workers = self.max_workers, "Starting batch");

        let permits = Arc::new(Semaphore::new(self.max_workers));
        let handles: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                // Fixed before spawning so a panicked worker reports the same id
                let input = with_normalized_id(input);
                let fallback = input.clone();
                let pipeline = Arc::clone(self);
                let permits = Arc::clone(&permits);
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    pipeline.process(input).await
                });
                (fallback, handle)
            })
            .collect();

        let (fallbacks, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let joined = join_all(handles).await;

        let results: Vec<ProcessingResult> = joined
            .into_iter()
            .zip(fallbacks)
            .map(|(joined, input)| match joined {
                Ok(result) => result,
                Err(e) => worker_failure(input, &e.to_string()),
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.status.is_success()).count();
        info!(
            emails = total,
            succeeded,
            failed = total - succeeded,
            "Batch complete"
        );
        results
    }
}

/// Backfill the record's `id` in place. Non-record inputs pass through.
fn with_normalized_id(input: Value) -> Value {
    match input {
        Value::Object(mut record) => {
            let id = normalize_id(record.get("id"));
            record.insert("id".to_string(), Value::String(id));
            Value::Object(record)
        }
        other => other,
    }
}

/// Result for an email whose worker task died.
fn worker_failure(input: Value, reason: &str) -> ProcessingResult {
    let (email_id, original) = match with_normalized_id(input) {
        Value::Object(record) => (normalize_id(record.get("id")), Value::Object(record)),
        other => (UNKNOWN_EMAIL_ID.to_string(), preview_input(&other)),
    };
    let err = PipelineError::WorkerFailed {
        email_id: email_id.clone(),
        reason: reason.to_string(),
    };
    error!(email_id = %email_id, error = %err, "Worker task failed");
    ProcessingResult::failure(email_id, original, None, &err, PipelineStage::Failed)
}
