use std::fmt;

/// The client-side view of where the conversation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    #[default]
    Disconnected,
    Connecting,
    Listening,
    Processing,
    Speaking,
    Error,
}

impl ConversationState {
    /// `start` is only accepted from these states.
    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Disconnected | ConversationState::Error)
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversationState::Disconnected => "disconnected",
            ConversationState::Connecting => "connecting",
            ConversationState::Listening => "listening",
            ConversationState::Processing => "processing",
            ConversationState::Speaking => "speaking",
            ConversationState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Who a transcript entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Ai,
    User,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Ai => f.write_str("ai"),
            Sender::User => f.write_str("user"),
        }
    }
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    id: String,
    sender: Sender,
    text: String,
    /// Milliseconds since the unix epoch.
    timestamp: i64,
}

impl Message {
    pub fn new(id: impl Into<String>, sender: Sender, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            sender,
            text: text.into(),
            timestamp,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&ConversationState::Processing).unwrap();
        assert_eq!(json, r#""processing""#);
        assert_eq!(ConversationState::Speaking.to_string(), "speaking");
    }

    #[test]
    fn test_idle_states() {
        assert!(ConversationState::Disconnected.is_idle());
        assert!(ConversationState::Error.is_idle());
        assert!(!ConversationState::Connecting.is_idle());
        assert!(!ConversationState::Listening.is_idle());
    }

    #[test]
    fn test_message_serialize() {
        let message = Message::new("ai-1", Sender::Ai, "hola", 42);
        let json = serde_json::to_string(&message).unwrap();
        let expected = r#"{"id":"ai-1","sender":"ai","text":"hola","timestamp":42}"#;
        assert_eq!(json, expected);
    }
}
