use chrono::Utc;

use crate::chat::ReplyMetadata;
use crate::store::MessageStore;
use crate::types::{HistoryEntry, Message, MessageId};

/// Credits a fresh session starts with when the caller does not know better
pub const DEFAULT_INITIAL_CREDITS: u64 = 100;

/// Hands out message ids derived from the wall clock.
///
/// Two ids requested within the same millisecond (or after the clock stepped
/// backwards) are bumped past the previous one, so ids strictly increase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdGenerator {
    last: MessageId,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> MessageId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_after(now)
    }

    /// Next id given a clock reading in milliseconds
    pub fn next_after(&mut self, now_millis: u64) -> MessageId {
        let id = if now_millis > self.last {
            now_millis
        } else {
            self.last + 1
        };
        self.last = id;
        id
    }
}

/// What a caller needs to issue a turn that was just started
#[derive(Debug, Clone, PartialEq)]
pub struct TurnStart {
    /// Id of the optimistic user message
    pub message_id: MessageId,
    /// Every message that preceded the new one
    pub history: Vec<HistoryEntry>,
}

/// Client-side projection of one conversation.
///
/// Created fresh per session and discarded with it; nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    messages: MessageStore,
    current_intent: Option<String>,
    token_credits: u64,
    is_loading: bool,
    ids: IdGenerator,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_CREDITS)
    }
}

impl SessionState {
    pub fn new(initial_credits: u64) -> Self {
        Self {
            messages: MessageStore::new(),
            current_intent: None,
            token_credits: initial_credits,
            is_loading: false,
            ids: IdGenerator::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.read_all()
    }

    pub fn store(&self) -> &MessageStore {
        &self.messages
    }

    pub fn current_intent(&self) -> Option<&str> {
        self.current_intent.as_deref()
    }

    pub fn token_credits(&self) -> u64 {
        self.token_credits
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The conversation as it is replayed to the backend
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(HistoryEntry::from).collect()
    }

    pub fn next_id(&mut self) -> MessageId {
        self.ids.next_id()
    }

    /// Append an externally built message
    pub fn append(&mut self, message: Message) -> MessageId {
        self.messages.append(message).id
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        let id = self.next_id();
        self.append(Message::user(id, text))
    }

    pub fn push_error(&mut self, text: impl Into<String>) -> MessageId {
        let id = self.next_id();
        self.append(Message::error(id, text))
    }

    /// Start a turn: capture the prior history, append the user message and
    /// mark the session busy. Returns `None` while another turn is in flight.
    pub fn begin_turn(&mut self, text: &str) -> Option<TurnStart> {
        if self.is_loading {
            return None;
        }
        let history = self.history();
        let message_id = self.push_user(text);
        self.is_loading = true;
        Some(TurnStart {
            message_id,
            history,
        })
    }

    /// Commit a finished reply and the metadata that came with it
    pub fn apply_reply(&mut self, text: impl Into<String>, metadata: &ReplyMetadata) -> MessageId {
        let id = self.next_id();
        self.append(Message::ai(id, text, metadata.intent.clone()));
        self.current_intent = metadata.intent.clone();
        if let Some(credits) = metadata.token_credits {
            self.token_credits = credits;
        }
        id
    }

    pub fn finish_turn(&mut self) {
        self.is_loading = false;
    }

    pub fn set_token_credits(&mut self, credits: u64) {
        self.token_credits = credits;
    }

    pub fn set_current_intent(&mut self, intent: Option<String>) {
        self.current_intent = intent;
    }

    /// Start a new conversation. Credits and the loading flag are untouched.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.current_intent = None;
    }
}
