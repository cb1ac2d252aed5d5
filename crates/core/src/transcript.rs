use chrono::Utc;
use uuid::Uuid;
use verba_types::{Message, Sender};

/// Append-only log of the conversation, oldest first.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    last_timestamp: i64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message stamped with the current time. Timestamps never go
    /// backwards and never repeat, even within the same millisecond.
    pub fn push(&mut self, sender: Sender, text: &str) -> Message {
        let timestamp = Utc::now().timestamp_millis().max(self.last_timestamp + 1);
        self.last_timestamp = timestamp;
        let message = Message::new(
            format!("{}-{}", sender, Uuid::new_v4()),
            sender,
            text.to_string(),
            timestamp,
        );
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
