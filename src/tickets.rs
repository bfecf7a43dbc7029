//! Ticketing side effects (best-effort, never fatal to an email).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::error::TicketError;

/// Ticket classification tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Complaint,
    SupportRequest,
    Feedback,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complaint => "complaint",
            Self::SupportRequest => "support_request",
            Self::Feedback => "feedback",
        }
    }
}

/// Ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Normal,
    Urgent,
}

/// A ticket to open for a processed email.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRequest {
    pub email_id: String,
    pub description: String,
    pub ticket_type: TicketType,
    pub priority: TicketPriority,
    pub recipient: String,
}

/// Ticketing backend.
#[async_trait]
pub trait TicketClient: Send + Sync {
    /// Open a ticket, returning the backend's ticket id.
    async fn create_ticket(&self, request: &TicketRequest) -> Result<u64, TicketError>;
}

// ── Zendesk ─────────────────────────────────────────────────────────

/// Zendesk credentials, built from environment variables.
#[derive(Debug, Clone)]
pub struct ZendeskConfig {
    /// Base URL, e.g. `https://acme.zendesk.com`.
    pub base_url: String,
    /// Agent email; the API user is `{email}/token`.
    pub email: String,
    pub api_token: SecretString,
}

impl ZendeskConfig {
    /// Returns `None` if `ZENDESK_DOMAIN` is not set (ticketing disabled).
    pub fn from_env() -> Option<Self> {
        let domain = std::env::var("ZENDESK_DOMAIN").ok()?;

        Some(Self {
            base_url: format!("https://{}", domain.trim_end_matches('/')),
            email: std::env::var("ZENDESK_EMAIL").unwrap_or_default(),
            api_token: SecretString::from(std::env::var("ZENDESK_API_TOKEN").unwrap_or_default()),
        })
    }
}

/// Zendesk REST ticket client.
pub struct ZendeskClient {
    http: reqwest::Client,
    config: ZendeskConfig,
}

#[derive(Deserialize)]
struct CreatedTicket {
    ticket: TicketId,
}

#[derive(Deserialize)]
struct TicketId {
    id: u64,
}

impl ZendeskClient {
    pub fn new(config: ZendeskConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn tickets_url(&self) -> String {
        format!("{}/api/v2/tickets.json", self.config.base_url.trim_end_matches('/'))
    }
}

/// Zendesk ticket payload for a request.
pub fn ticket_payload(request: &TicketRequest) -> serde_json::Value {
    json!({
        "ticket": {
            "subject": format!("Support Request - Email ID {}", request.email_id),
            "comment": { "body": request.description },
            "priority": request.priority,
            "status": "open",
            "requester": {
                "name": "Customer from Email",
                "email": request.recipient,
            },
            "tags": ["email_automation", request.ticket_type.as_str()],
        }
    })
}

#[async_trait]
impl TicketClient for ZendeskClient {
    async fn create_ticket(&self, request: &TicketRequest) -> Result<u64, TicketError> {
        let response = self
            .http
            .post(self.tickets_url())
            .basic_auth(
                format!("{}/token", self.config.email),
                Some(self.config.api_token.expose_secret()),
            )
            .json(&ticket_payload(request))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 201 {
            let body = response.text().await.unwrap_or_default();
            error!(
                email_id = %request.email_id,
                status = status.as_u16(),
                "Failed to create Zendesk ticket"
            );
            return Err(TicketError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedTicket = response.json().await?;
        info!(
            email_id = %request.email_id,
            ticket_id = created.ticket.id,
            ticket_type = request.ticket_type.as_str(),
            "Created Zendesk ticket"
        );
        Ok(created.ticket.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> TicketRequest {
        TicketRequest {
            email_id: "314".into(),
            description: "Urgent ticket for complaint issue".into(),
            ticket_type: TicketType::Complaint,
            priority: TicketPriority::Urgent,
            recipient: "angry@example.com".into(),
        }
    }

    fn client(server: &MockServer) -> ZendeskClient {
        ZendeskClient::new(ZendeskConfig {
            base_url: server.uri(),
            email: "agent@example.com".into(),
            api_token: SecretString::from("tok"),
        })
    }

    #[test]
    fn payload_shape() {
        let payload = ticket_payload(&request());
        let ticket = &payload["ticket"];
        assert_eq!(ticket["subject"], "Support Request - Email ID 314");
        assert_eq!(ticket["comment"]["body"], "Urgent ticket for complaint issue");
        assert_eq!(ticket["priority"], "urgent");
        assert_eq!(ticket["status"], "open");
        assert_eq!(ticket["requester"]["email"], "angry@example.com");
        assert_eq!(ticket["tags"], json!(["email_automation", "complaint"]));
    }

    #[tokio::test]
    async fn created_ticket_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/tickets.json"))
            .and(body_partial_json(json!({"ticket": {"status": "open"}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ticket": {"id": 981}})))
            .mount(&server)
            .await;

        let id = client(&server).create_ticket(&request()).await.unwrap();
        assert_eq!(id, 981);
    }

    #[tokio::test]
    async fn non_201_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid requester"))
            .mount(&server)
            .await;

        let err = client(&server).create_ticket(&request()).await.unwrap_err();
        match err {
            TicketError::Rejected { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "invalid requester");
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }
}
