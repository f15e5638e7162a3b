pub mod chat;
pub mod intent;
pub mod state;
pub mod store;
pub mod types;

pub use chat::{extract_credits, ChatTurnRequest, ReplyMetadata, CREDIT_FIELDS};
pub use intent::{display_label, IntentAction, IntentKind};
pub use state::{IdGenerator, SessionState, TurnStart, DEFAULT_INITIAL_CREDITS};
pub use store::MessageStore;
pub use types::{HistoryEntry, Message, MessageId, Role, Sender};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
