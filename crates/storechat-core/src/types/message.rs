use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::history::Role;

/// Unique message identifier, monotonically increasing within a session
pub type MessageId = u64;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    /// Wire role used when the message is replayed as conversation history
    pub fn role(&self) -> Role {
        match self {
            Sender::User => Role::User,
            Sender::Ai => Role::Assistant,
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Ai => write!(f, "ai"),
        }
    }
}

/// A single entry of the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub is_typing: bool,
}

impl Message {
    /// Create a user message
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            intent: None,
            is_error: false,
            is_typing: false,
        }
    }

    /// Create an assistant reply, optionally tagged with the detected intent
    pub fn ai(id: MessageId, text: impl Into<String>, intent: Option<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::Ai,
            timestamp: Utc::now(),
            intent,
            is_error: false,
            is_typing: false,
        }
    }

    /// Create an assistant entry that surfaces a failure
    pub fn error(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::ai(id, text, None)
        }
    }

    /// Create an in-progress placeholder for a reply that is still streaming
    pub fn typing(id: MessageId) -> Self {
        Self {
            is_typing: true,
            ..Self::ai(id, String::new(), None)
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_ai(&self) -> bool {
        self.sender == Sender::Ai
    }
}
