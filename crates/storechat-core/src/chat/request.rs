use serde::{Deserialize, Serialize};

use crate::types::HistoryEntry;

/// Body of one conversation turn sent to the backend.
///
/// The history is the whole conversation so far and is never truncated; the
/// backend decides what fits its context window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,
    #[serde(rename = "chatHistory")]
    pub chat_history: Vec<HistoryEntry>,
}

impl ChatTurnRequest {
    pub fn new(message: impl Into<String>, chat_history: Vec<HistoryEntry>) -> Self {
        Self {
            message: message.into(),
            chat_history,
        }
    }
}
