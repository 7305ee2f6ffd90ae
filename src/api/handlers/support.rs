//! Support tickets and the support inbox notification.
//!
//! Hosts see only their own tickets. Owners see every ticket, reply as
//! `SUPPORT` and move tickets between statuses. A ticket the caller may not
//! see is reported as missing rather than forbidden.

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{
    auth::{
        principal::{authenticate, require_owner},
        AuthState,
    },
    non_empty, parse_body, ApiError, ErrorBody, SuccessBody,
};
use crate::{
    email::{EmailMessage, EmailSender},
    models::support::{
        self, NewTicket, SenderRole, SupportError, SupportTicket, TicketStatus,
    },
    store::SharedStore,
    upstream::HostIdentity,
};

pub const DEFAULT_SUPPORT_EMAIL: &str = "support@hostdash.app";

#[derive(Clone, Debug)]
pub struct SupportConfig {
    support_email: String,
}

impl SupportConfig {
    #[must_use]
    pub fn new(support_email: String) -> Self {
        Self { support_email }
    }

    #[must_use]
    pub fn support_email(&self) -> &str {
        &self.support_email
    }
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORT_EMAIL.to_string())
    }
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct NewMessageRequest {
    #[serde(default)]
    pub body: String,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct StatusRequest {
    #[schema(value_type = Option<TicketStatus>)]
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotifyRequest {
    #[serde(default)]
    pub ticket_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<SupportError> for ApiError {
    fn from(err: SupportError) -> Self {
        match err {
            SupportError::MissingFields => Self::missing_fields(),
            SupportError::TooLong => Self::Validation {
                code: "invalid_payload",
                message: Some(err.to_string()),
            },
            SupportError::NotFound => Self::NotFound,
            SupportError::Store(err) => {
                error!("document store failure: {err}");
                Self::Internal
            }
        }
    }
}

/// Load a ticket the caller is allowed to see.
async fn visible_ticket(
    store: &SharedStore,
    auth: &AuthState,
    identity: &HostIdentity,
    ticket_id: &str,
) -> Result<SupportTicket, ApiError> {
    let ticket = support::get_ticket(store.as_ref(), ticket_id).await?;
    if ticket.user_id == identity.uid || auth.config().is_owner(identity) {
        Ok(ticket)
    } else {
        Err(ApiError::NotFound)
    }
}

#[utoipa::path(
    post,
    path = "/api/support/tickets",
    request_body = NewTicket,
    responses(
        (status = 201, description = "Ticket opened", body = SupportTicket),
        (status = 400, description = "Invalid ticket", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    tag = "support"
)]
pub async fn create_ticket(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
    body: Bytes,
) -> Result<(StatusCode, Json<SupportTicket>), ApiError> {
    let identity = authenticate(&headers, &auth).await?;
    let new_ticket: NewTicket = parse_body(&body)?;
    let ticket = support::create_ticket(
        store.as_ref(),
        &identity.uid,
        identity.email.clone(),
        new_ticket,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/api/support/tickets",
    responses(
        (status = 200, description = "Caller's tickets, newest first", body = [SupportTicket]),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    tag = "support"
)]
pub async fn list_tickets(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Vec<SupportTicket>>, ApiError> {
    let identity = authenticate(&headers, &auth).await?;
    let tickets = support::list_for_user(store.as_ref(), &identity.uid)
        .await
        .map_err(SupportError::from)?;
    Ok(Json(tickets))
}

#[utoipa::path(
    get,
    path = "/api/support/tickets/{ticket_id}",
    params(("ticket_id" = String, Path, description = "Ticket id, e.g. TKT-7F3K9QPA")),
    responses(
        (status = 200, description = "Ticket with its messages", body = SupportTicket),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "Unknown ticket", body = ErrorBody)
    ),
    tag = "support"
)]
pub async fn get_ticket(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
    Path(ticket_id): Path<String>,
) -> Result<Json<SupportTicket>, ApiError> {
    let identity = authenticate(&headers, &auth).await?;
    visible_ticket(&store, &auth, &identity, &ticket_id)
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/api/support/tickets/{ticket_id}/messages",
    params(("ticket_id" = String, Path, description = "Ticket id")),
    request_body = NewMessageRequest,
    responses(
        (status = 200, description = "Message appended", body = SupportTicket),
        (status = 400, description = "Empty or oversized message", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "Unknown ticket", body = ErrorBody)
    ),
    tag = "support"
)]
pub async fn add_message(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
    Path(ticket_id): Path<String>,
    body: Bytes,
) -> Result<Json<SupportTicket>, ApiError> {
    let identity = authenticate(&headers, &auth).await?;
    let request: NewMessageRequest = parse_body(&body)?;
    let ticket = visible_ticket(&store, &auth, &identity, &ticket_id).await?;

    let sender = if ticket.user_id == identity.uid {
        SenderRole::User
    } else {
        SenderRole::Support
    };
    let ticket = support::append_message(
        store.as_ref(),
        &ticket.ticket_id,
        sender,
        &identity.uid,
        &request.body,
    )
    .await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/support/tickets/{ticket_id}/status",
    params(("ticket_id" = String, Path, description = "Ticket id")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed", body = SupportTicket),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 403, description = "Caller is not an owner", body = ErrorBody),
        (status = 404, description = "Unknown ticket", body = ErrorBody)
    ),
    tag = "support"
)]
pub async fn update_status(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
    Path(ticket_id): Path<String>,
    body: Bytes,
) -> Result<Json<SupportTicket>, ApiError> {
    require_owner(&headers, &auth).await?;
    let request: StatusRequest = parse_body(&body)?;
    let status: TicketStatus = request
        .status
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| ApiError::validation("invalid_status"))?;

    let ticket = support::set_status(store.as_ref(), &ticket_id, status).await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/support/notify",
    request_body = NotifyRequest,
    responses(
        (status = 200, description = "Support inbox notified", body = SuccessBody),
        (status = 400, description = "Missing ticket id or message", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "Unknown ticket", body = ErrorBody),
        (status = 502, description = "Email delivery failed", body = ErrorBody)
    ),
    tag = "support"
)]
pub async fn notify(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
    Extension(email): Extension<Arc<dyn EmailSender>>,
    Extension(config): Extension<Arc<SupportConfig>>,
    body: Bytes,
) -> Result<Json<SuccessBody>, ApiError> {
    let identity = authenticate(&headers, &auth).await?;
    let request: NotifyRequest = parse_body(&body)?;
    let (Some(ticket_id), Some(message)) = (
        non_empty(request.ticket_id.as_deref()),
        non_empty(request.message.as_deref()),
    ) else {
        return Err(ApiError::missing_fields());
    };
    let ticket = visible_ticket(&store, &auth, &identity, ticket_id).await?;

    let from = identity.email.as_deref().unwrap_or(&identity.uid);
    let email_message = EmailMessage {
        to_email: config.support_email().to_string(),
        subject: format!("[{}] {}", ticket.ticket_id, ticket.subject),
        text: format!(
            "Ticket: {}\nCategory: {:?}\nPriority: {:?}\nFrom: {from}\n\n{message}\n",
            ticket.ticket_id, ticket.category, ticket.priority
        ),
    };
    if let Err(err) = email.send(&email_message).await {
        error!(ticket_id = %ticket.ticket_id, "support notification failed: {err:#}");
        return Err(ApiError::BadGateway {
            code: "email_failed",
        });
    }

    info!(ticket_id = %ticket.ticket_id, "support inbox notified");
    Ok(Json(SuccessBody::OK))
}
