//! Bounded conversation history.

use promethios_core::message::Message;

/// User/assistant exchanges, oldest first, capped at `cap` messages.
///
/// Only whole exchanges are stored, so the length is always even. When the
/// cap is exceeded the oldest exchange is dropped.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    cap: usize,
}

impl ConversationHistory {
    /// `cap` is rounded down to an even number, minimum 2.
    pub fn new(cap: usize) -> Self {
        Self {
            messages: Vec::new(),
            cap: (cap - cap % 2).max(2),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn push_exchange(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.messages.push(Message::user(prompt));
        self.messages.push(Message::assistant(response));
        while self.messages.len() > self.cap {
            self.messages.drain(..2);
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(20)
    }
}
