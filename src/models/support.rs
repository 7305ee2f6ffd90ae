//! Support tickets and their message threads.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, instrument};
use ulid::Ulid;
use utoipa::ToSchema;

use crate::store::{
    decode, encode, encode_only, update_with_retry, DocumentStore, Precondition, StoreError,
};

pub const COLLECTION: &str = "support_tickets";

const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

/// Fields a thread update touches; everything else is fixed at creation.
const THREAD_FIELDS: &[&str] = &["messages", "status", "updatedAt"];

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    Payments,
    Bookings,
    Events,
    Account,
    Other,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderRole {
    User,
    Support,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    pub sender: SenderRole,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub ticket_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_email: Option<String>,
    pub subject: String,
    pub category: TicketCategory,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(ToSchema, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTicket {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub category: Option<TicketCategory>,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Error)]
pub enum SupportError {
    #[error("subject, category and message are required")]
    MissingFields,

    #[error("subject or message is too long")]
    TooLong,

    #[error("ticket not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Human readable ticket id: `TKT-` followed by 8 Crockford base32 characters.
#[must_use]
pub fn new_ticket_id() -> String {
    let ulid = Ulid::new().to_string();
    // The trailing characters of a ULID are random; the leading ones are a timestamp.
    format!("TKT-{}", &ulid[ulid.len() - 8..])
}

#[must_use]
pub fn is_ticket_id(candidate: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^TKT-[0-9A-HJKMNP-TV-Z]{8}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(candidate))
}

fn validate_text(subject: Option<&str>, message: &str) -> Result<(), SupportError> {
    if subject.is_some_and(|s| s.trim().is_empty()) || message.trim().is_empty() {
        return Err(SupportError::MissingFields);
    }
    if subject.is_some_and(|s| s.chars().count() > MAX_SUBJECT_LEN)
        || message.chars().count() > MAX_MESSAGE_LEN
    {
        return Err(SupportError::TooLong);
    }
    Ok(())
}

/// Open a ticket with the first message from the host.
///
/// # Errors
/// Returns an error for a missing category, blank or oversized text, or when the store fails.
#[instrument(skip(store, new_ticket, user_email))]
pub async fn create_ticket(
    store: &dyn DocumentStore,
    user_id: &str,
    user_email: Option<String>,
    new_ticket: NewTicket,
) -> Result<SupportTicket, SupportError> {
    let category = new_ticket.category.ok_or(SupportError::MissingFields)?;
    validate_text(Some(&new_ticket.subject), &new_ticket.message)?;

    let now = Utc::now();
    let ticket = SupportTicket {
        ticket_id: new_ticket_id(),
        user_id: user_id.to_string(),
        user_email,
        subject: new_ticket.subject.trim().to_string(),
        category,
        status: TicketStatus::Open,
        priority: new_ticket.priority.unwrap_or_default(),
        messages: vec![TicketMessage {
            sender: SenderRole::User,
            author_id: user_id.to_string(),
            body: new_ticket.message.trim().to_string(),
            created_at: now,
        }],
        created_at: now,
        updated_at: now,
    };
    let fields = encode(COLLECTION, &ticket.ticket_id, &ticket)?;
    store
        .patch(COLLECTION, &ticket.ticket_id, fields, Precondition::Missing)
        .await?;

    info!(ticket_id = %ticket.ticket_id, "support ticket created");
    Ok(ticket)
}

/// Fetch a single ticket.
///
/// # Errors
/// Returns `SupportError::NotFound` for unknown or malformed ids.
pub async fn get_ticket(
    store: &dyn DocumentStore,
    ticket_id: &str,
) -> Result<SupportTicket, SupportError> {
    if !is_ticket_id(ticket_id) {
        return Err(SupportError::NotFound);
    }
    match store.get(COLLECTION, ticket_id).await? {
        Some(document) => Ok(decode(COLLECTION, ticket_id, document)?),
        None => Err(SupportError::NotFound),
    }
}

/// All tickets opened by `user_id`, newest first.
///
/// # Errors
/// Returns an error if the store fails or a document cannot be decoded.
pub async fn list_for_user(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Vec<SupportTicket>, StoreError> {
    let mut tickets = store
        .query(COLLECTION, "userId", &Value::from(user_id))
        .await?
        .into_iter()
        .map(|(id, document)| decode::<SupportTicket>(COLLECTION, &id, document))
        .collect::<Result<Vec<_>, _>>()?;
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(tickets)
}

/// Apply `change` to the stored ticket and write back its thread fields,
/// retrying when another writer updated the ticket in between.
async fn update_thread<F>(
    store: &dyn DocumentStore,
    ticket_id: &str,
    mut change: F,
) -> Result<SupportTicket, SupportError>
where
    F: FnMut(&mut SupportTicket) + Send,
{
    if !is_ticket_id(ticket_id) {
        return Err(SupportError::NotFound);
    }
    update_with_retry(store, COLLECTION, ticket_id, |current| {
        let document = current.ok_or(SupportError::NotFound)?;
        let mut ticket: SupportTicket = decode(COLLECTION, ticket_id, document)?;
        change(&mut ticket);
        let fields = encode_only(COLLECTION, ticket_id, &ticket, THREAD_FIELDS)?;
        Ok((fields, ticket))
    })
    .await
}

/// Append a message to the thread.
///
/// A host replying to a resolved or closed ticket reopens it.
///
/// # Errors
/// Returns an error for blank or oversized text, an unknown ticket, or when the store fails.
#[instrument(skip(store, body))]
pub async fn append_message(
    store: &dyn DocumentStore,
    ticket_id: &str,
    sender: SenderRole,
    author_id: &str,
    body: &str,
) -> Result<SupportTicket, SupportError> {
    validate_text(None, body)?;
    let body = body.trim();

    update_thread(store, ticket_id, |ticket| {
        let now = Utc::now();
        ticket.messages.push(TicketMessage {
            sender,
            author_id: author_id.to_string(),
            body: body.to_string(),
            created_at: now,
        });
        if sender == SenderRole::User
            && matches!(ticket.status, TicketStatus::Resolved | TicketStatus::Closed)
        {
            ticket.status = TicketStatus::Open;
        }
        ticket.updated_at = now;
    })
    .await
}

/// Move a ticket to a new status.
///
/// # Errors
/// Returns an error for an unknown ticket or when the store fails.
#[instrument(skip(store))]
pub async fn set_status(
    store: &dyn DocumentStore,
    ticket_id: &str,
    status: TicketStatus,
) -> Result<SupportTicket, SupportError> {
    let ticket = update_thread(store, ticket_id, |ticket| {
        ticket.status = status;
        ticket.updated_at = Utc::now();
    })
    .await?;
    info!(?status, "support ticket status changed");
    Ok(ticket)
}
