//! Conversation state: messages and their corrections
//!
//! The conversation is append-only. Message ids are assigned here and
//! strictly increase in creation order.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// Fact-check annotation attached to a bot message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Correction {
    /// Fact-checking was not performed
    #[default]
    None,
    /// Verification found the statement correct
    Confirmed,
    /// Verification found a discrepancy
    Corrected(String),
    /// Verification was not attempted for this statement
    Skipped(String),
    /// Verification could not be completed
    Unavailable(String),
}

impl Correction {
    /// The correction text shown to the user, if any
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Correction::None | Correction::Confirmed => None,
            Correction::Corrected(text)
            | Correction::Skipped(text)
            | Correction::Unavailable(text) => Some(text),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Correction::None => "none",
            Correction::Confirmed => "confirmed",
            Correction::Corrected(_) => "corrected",
            Correction::Skipped(_) => "skipped",
            Correction::Unavailable(_) => "unavailable",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: u64,
    text: String,
    sender: Sender,
    correction: Correction,
    is_error: bool,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn correction(&self) -> &Correction {
        &self.correction
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Ordered, append-only message list
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    last_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message
    pub fn push_user(&mut self, text: impl Into<String>) -> &Message {
        self.push(text.into(), Sender::User, Correction::None, false)
    }

    /// Append a bot reply with its fact-check annotation
    pub fn push_bot(&mut self, text: impl Into<String>, correction: Correction) -> &Message {
        self.push(text.into(), Sender::Bot, correction, false)
    }

    /// Append a bot message reporting a failed turn
    pub fn push_error(&mut self, text: impl Into<String>) -> &Message {
        self.push(text.into(), Sender::Bot, Correction::None, true)
    }

    fn push(
        &mut self,
        text: String,
        sender: Sender,
        correction: Correction,
        is_error: bool,
    ) -> &Message {
        self.last_id += 1;
        let index = self.messages.len();
        self.messages.push(Message {
            id: self.last_id,
            text,
            sender,
            correction,
            is_error,
            created_at: Utc::now(),
        });
        &self.messages[index]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent `n` messages in chronological order
    pub fn last_n(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}
