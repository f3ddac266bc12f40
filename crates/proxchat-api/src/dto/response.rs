//! Response bodies. The cell code is server-internal and appears in
//! none of these.

use chrono::{DateTime, Utc};
use serde::Serialize;

use proxchat_service::location::NearbyUser;
use proxchat_service::message::ChatMessage;
use proxchat_service::session::Session;

/// Data payload of `POST /api/session/create`.
#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub id: String,
    pub username: String,
    pub changes_left: u32,
    pub max_changes: u32,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionCreated {
    fn from(session: Session) -> Self {
        Self {
            changes_left: session.remaining_changes(),
            max_changes: session.max_username_changes,
            id: session.id,
            username: session.username,
            created_at: session.created_at,
        }
    }
}

/// Data payload of `PATCH /api/session/username`.
#[derive(Debug, Serialize)]
pub struct UsernameUpdated {
    pub username: String,
    pub changes_left: u32,
}

/// Data payload of `POST /api/location/update`.
#[derive(Debug, Serialize)]
pub struct LocationUpdated {
    pub message: &'static str,
}

/// Data payload of `GET /api/nearby`.
#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    pub count: usize,
    pub users: Vec<NearbyUser>,
}

/// One entry of `GET /api/recent-messages`.
#[derive(Debug, Serialize)]
pub struct MessageEntry {
    pub id: String,
    pub sender_id: String,
    pub username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessage> for MessageEntry {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            username: message.username,
            content: message.content,
            timestamp: message.timestamp,
        }
    }
}

/// Data payload of `GET /api/recent-messages`.
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageEntry>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: DateTime<Utc>,
}
