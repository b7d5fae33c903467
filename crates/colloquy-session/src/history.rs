use colloquy_core::{Message, Role};
use serde::{Deserialize, Serialize};

/// Ordered conversation history.
///
/// Messages can only be appended. Callers that need a bounded view (for the
/// backend's context window) slice [`History::messages`] instead of trimming
/// the history itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` at the end.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends a message built from `role` and `content`.
    pub fn push_as(&mut self, role: Role, content: impl Into<String>) {
        self.push(Message::new(role, content));
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
