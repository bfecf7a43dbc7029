//! Category dispatch and the shared handler routine.
//!
//! Each category maps to a `CategoryRoute` record; one generic routine
//! consumes it: generate → send → gated side effect → log.
//!
//! Side effects fire only after a successful send, so no ticket ever
//! references a reply the customer did not receive.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::channels::Transport;
use crate::error::{ChannelError, TicketError};
use crate::pipeline::responder::{ReplyGenerator, fallback_template};
use crate::pipeline::state::{Lifecycle, PipelineStage};
use crate::pipeline::types::{Category, ProcessingStatus, ValidEmail};
use crate::store::{LogRecord, OutcomeLog};
use crate::tickets::{TicketClient, TicketPriority, TicketRequest, TicketType};

// ── Route records ───────────────────────────────────────────────────

/// How a reply is sent; selects the outbound subject line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRoutine {
    Complaint,
    Standard,
}

impl SendRoutine {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Complaint => "Regarding Your Complaint",
            Self::Standard => "Regarding Your Standard Inquiry",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Complaint => "complaint",
            Self::Standard => "standard",
        }
    }
}

/// Action taken after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    UrgentTicket,
    SupportTicket,
    FeedbackRecord,
}

impl SideEffect {
    /// Ticket to open for `email`.
    pub fn ticket_for(&self, email: &ValidEmail) -> TicketRequest {
        let (description, ticket_type, priority) = match self {
            Self::UrgentTicket => (
                "Urgent ticket for complaint issue".to_string(),
                TicketType::Complaint,
                TicketPriority::Urgent,
            ),
            Self::SupportTicket => (
                email.body.clone(),
                TicketType::SupportRequest,
                TicketPriority::Normal,
            ),
            Self::FeedbackRecord => (
                email.body.clone(),
                TicketType::Feedback,
                TicketPriority::Normal,
            ),
        };

        TicketRequest {
            email_id: email.id.clone(),
            description,
            ticket_type,
            priority,
            recipient: email.recipient.clone(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::UrgentTicket => "urgent ticket",
            Self::SupportTicket => "support ticket",
            Self::FeedbackRecord => "feedback record",
        }
    }
}

/// Per-category handler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRoute {
    pub category: Category,
    pub fallback_template: &'static str,
    pub send: SendRoutine,
    pub side_effect: Option<SideEffect>,
}

/// The dispatch table. Exhaustive over the closed category set, so there
/// is no unknown-category path once classification has succeeded.
pub fn route_for(category: Category) -> CategoryRoute {
    let (send, side_effect) = match category {
        Category::Complaint => (SendRoutine::Complaint, Some(SideEffect::UrgentTicket)),
        Category::Inquiry => (SendRoutine::Standard, None),
        Category::Feedback => (SendRoutine::Standard, Some(SideEffect::FeedbackRecord)),
        Category::SupportRequest => (SendRoutine::Standard, Some(SideEffect::SupportTicket)),
        Category::Other => (SendRoutine::Standard, None),
    };

    CategoryRoute {
        category,
        fallback_template: fallback_template(category),
        send,
        side_effect,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

/// Result of one handler invocation.
#[derive(Debug)]
pub struct HandlerOutcome {
    pub status: ProcessingStatus,
    /// The reply that was (or would have been) sent.
    pub reply: String,
    /// Set exactly when the send failed.
    pub send_error: Option<ChannelError>,
    /// Ticket id, when a side effect ran and succeeded.
    pub ticket_id: Option<u64>,
    /// Whether the outcome reached the log.
    pub logged: bool,
}

impl HandlerOutcome {
    pub fn sent(&self) -> bool {
        self.status.is_success()
    }
}

/// Runs the shared handler routine against injected collaborators.
pub struct Dispatcher {
    responder: Arc<dyn ReplyGenerator>,
    transport: Arc<dyn Transport>,
    tickets: Option<Arc<dyn TicketClient>>,
    log: Arc<dyn OutcomeLog>,
    send_timeout: Duration,
    ticket_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        responder: Arc<dyn ReplyGenerator>,
        transport: Arc<dyn Transport>,
        tickets: Option<Arc<dyn TicketClient>>,
        log: Arc<dyn OutcomeLog>,
        send_timeout: Duration,
        ticket_timeout: Duration,
    ) -> Self {
        Self {
            responder,
            transport,
            tickets,
            log,
            send_timeout,
            ticket_timeout,
        }
    }

    /// Handle a classified email. `lifecycle` must be at `Handling`.
    ///
    /// Never fails: send errors become an error status, ticket and log
    /// errors are reported and otherwise ignored.
    pub async fn handle(
        &self,
        email: &ValidEmail,
        route: &CategoryRoute,
        lifecycle: &mut Lifecycle,
    ) -> HandlerOutcome {
        let category = route.category;

        // 1. Reply text (never empty)
        let reply = self
            .responder
            .generate(email, category, route.fallback_template)
            .await;

        // 2. Send
        info!(
            email_id = %email.id,
            routine = route.send.label(),
            "Sending {} response", route.send.label()
        );
        let send_error = self.send(email, route.send.subject(), &reply).await.err();
        let status = match &send_error {
            None => {
                lifecycle.advance(PipelineStage::Sent);
                ProcessingStatus::Success
            }
            Some(e) => {
                error!(email_id = %email.id, error = %e, "Failed to send reply");
                lifecycle.advance(PipelineStage::Failed);
                ProcessingStatus::Error
            }
        };

        // 3. Side effect, gated on delivery
        let ticket_id = match route.side_effect {
            Some(effect) if status.is_success() => self.run_side_effect(effect, email).await,
            Some(effect) => {
                warn!(
                    email_id = %email.id,
                    side_effect = effect.label(),
                    "Skipping side effect because the reply was not sent"
                );
                None
            }
            None => None,
        };

        // 4. Log, whatever happened above
        let record = LogRecord::new(&email.id, &email.recipient, category, &reply, status);
        let logged = match self.log.append(record).await {
            Ok(entry) => {
                debug!(email_id = %email.id, timestamp = %entry.timestamp, "Outcome logged");
                lifecycle.advance(PipelineStage::Logged);
                true
            }
            Err(e) => {
                error!(email_id = %email.id, error = %e, "Failed to append outcome log");
                false
            }
        };

        if status.is_success() {
            info!(email_id = %email.id, classification = category.as_str(), "Sent {category} response");
        } else {
            info!(email_id = %email.id, classification = category.as_str(), "Failed to send {category} response");
        }

        HandlerOutcome {
            status,
            reply,
            send_error,
            ticket_id,
            logged,
        }
    }

    async fn send(&self, email: &ValidEmail, subject: &str, reply: &str) -> Result<(), ChannelError> {
        tokio::time::timeout(
            self.send_timeout,
            self.transport.send(&email.id, &email.recipient, subject, reply),
        )
        .await
        .map_err(|_| ChannelError::Timeout {
            name: self.transport.name().to_string(),
            after: self.send_timeout,
        })?
    }

    async fn run_side_effect(&self, effect: SideEffect, email: &ValidEmail) -> Option<u64> {
        let Some(tickets) = &self.tickets else {
            info!(
                email_id = %email.id,
                side_effect = effect.label(),
                "Ticketing disabled, skipping side effect"
            );
            return None;
        };

        let request = effect.ticket_for(email);
        let preview: String = request.description.chars().take(50).collect();
        info!(
            email_id = %email.id,
            side_effect = effect.label(),
            ticket_type = request.ticket_type.as_str(),
            description = %preview,
            "Creating {}", effect.label()
        );

        let result = tokio::time::timeout(self.ticket_timeout, tickets.create_ticket(&request))
            .await
            .unwrap_or(Err(TicketError::Timeout {
                after: self.ticket_timeout,
            }));

        match result {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(
                    email_id = %email.id,
                    side_effect = effect.label(),
                    error = %e,
                    "Side effect failed"
                );
                None
            }
        }
    }
}
