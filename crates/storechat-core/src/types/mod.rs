pub mod history;
pub mod message;

pub use history::{HistoryEntry, Role};
pub use message::{Message, MessageId, Sender};
