use colloquy_core::Message;

/// Bounds how much history is sent to the backend on each call.
///
/// The window never owns or trims the history; it only hands out the most
/// recent slice of it.
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    max_messages: usize,
}

impl ContextWindow {
    /// Window of at most `max_messages`.
    pub fn new(max_messages: usize) -> Self {
        Self { max_messages }
    }

    /// Configured size.
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// The last `max_messages` entries of `history`, in original order.
    pub fn view<'a>(&self, history: &'a [Message]) -> &'a [Message] {
        let start = history.len().saturating_sub(self.max_messages);
        &history[start..]
    }

    /// Rough token estimation (4 chars ≈ 1 token) of what [`view`](Self::view) sends.
    pub fn estimated_tokens(&self, history: &[Message]) -> usize {
        self.view(history).iter().map(|m| m.content().len() / 4).sum()
    }
}
