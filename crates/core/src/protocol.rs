//! Interpretation of inbound JSON control messages.
//!
//! `interpret` is pure: it maps a message and the current state to the
//! effects the session has to apply. Anomalies (malformed JSON, unknown
//! types or states, empty text) never produce effects.

use std::str::FromStr;

use verba_types::{ControlMessage, ConversationState, RemoteState, Sender};

/// What `CLEAR_BUFFER` does to the state when it arrives during `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptPolicy {
    /// Always go back to `listening`.
    #[default]
    AlwaysListen,
    /// Stay in `processing`; every other state still goes to `listening`.
    PreserveProcessing,
}

impl FromStr for InterruptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listen" | "always-listen" => Ok(InterruptPolicy::AlwaysListen),
            "preserve-processing" => Ok(InterruptPolicy::PreserveProcessing),
            other => Err(format!("unknown interrupt policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ClearPlayback,
    Transition(ConversationState),
    Append(Sender, String),
}

/// Parses one text message. Malformed input and unknown types are logged and
/// dropped.
pub fn parse(text: &str) -> Option<ControlMessage> {
    match ControlMessage::from_json(text) {
        Ok(ControlMessage::Unknown) => {
            let kind = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string));
            tracing::warn!("Unknown message type: {}", kind.unwrap_or_default());
            None
        }
        Ok(message) => Some(message),
        Err(e) => {
            tracing::error!("Error parsing message: {}, text=> {:?}", e, text);
            None
        }
    }
}

pub fn interpret(
    message: &ControlMessage,
    current: ConversationState,
    policy: InterruptPolicy,
) -> Vec<Effect> {
    match message {
        ControlMessage::ClearBuffer => {
            let next = match (current, policy) {
                (ConversationState::Processing, InterruptPolicy::PreserveProcessing) => {
                    ConversationState::Processing
                }
                _ => ConversationState::Listening,
            };
            vec![Effect::ClearPlayback, Effect::Transition(next)]
        }
        ControlMessage::Transcript { text } => append(Sender::User, text.as_deref()),
        ControlMessage::AiResponse { text } => append(Sender::Ai, text.as_deref()),
        ControlMessage::StateChange { state } => match state {
            Some(RemoteState::Processing) => vec![Effect::Transition(ConversationState::Processing)],
            Some(RemoteState::Speaking) => vec![Effect::Transition(ConversationState::Speaking)],
            Some(RemoteState::Listening) => vec![Effect::Transition(ConversationState::Listening)],
            Some(RemoteState::Unknown) | None => {
                tracing::debug!("Ignoring STATE_CHANGE without a known state");
                vec![]
            }
        },
        ControlMessage::Unknown => vec![],
    }
}

fn append(sender: Sender, text: Option<&str>) -> Vec<Effect> {
    match text {
        Some(text) if !text.trim().is_empty() => vec![Effect::Append(sender, text.to_string())],
        _ => vec![],
    }
}
