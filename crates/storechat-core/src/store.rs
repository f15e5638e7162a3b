use crate::types::Message;

/// Append-only, ordered log of the messages in a session.
///
/// Insertion order is display order. Entries are never edited or removed
/// individually; the only way to shrink the log is [`MessageStore::clear`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the end of the log
    pub fn append(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Remove every message. Calling it on an empty store is a no-op.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// All messages in display order
    pub fn read_all(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut store = MessageStore::new();
        store.append(Message::user(1, "first"));
        store.append(Message::ai(2, "second", None));
        store.append(Message::user(3, "third"));

        let texts: Vec<&str> = store.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(store.last().map(|m| m.id), Some(3));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut store = MessageStore::new();
        store.append(Message::user(1, "hello"));

        store.clear();
        let once = store.clone();
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store, once);
    }
}
