//! API request and response types

use crate::conversation::{Message, Sender};
use crate::pipeline::{PipelineStatus, Toggles};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Wire form of a message
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    /// Text shown under the reply, `null` when there is nothing to show
    pub correction: Option<String>,
    pub correction_kind: &'static str,
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id(),
            text: message.text().to_string(),
            sender: message.sender(),
            correction: message.correction().display_text().map(ToString::to_string),
            correction_kind: message.correction().kind(),
            is_error: message.is_error(),
            created_at: message.created_at(),
        }
    }
}

/// Response with the whole conversation
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub messages: Vec<MessageView>,
    pub status: PipelineStatus,
    pub toggles: Toggles,
}

/// Response for a completed chat turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageView>,
    pub cancelled: bool,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Version information
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
