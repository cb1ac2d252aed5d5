/// State names the remote agent reports in `STATE_CHANGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteState {
    Processing,
    Speaking,
    Listening,
    #[serde(other)]
    Unknown,
}

/// Inbound JSON control messages, tagged by `type`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Barge-in: drop everything queued for playback.
    ClearBuffer,
    /// What the agent heard the user say.
    Transcript {
        #[serde(default)]
        text: Option<String>,
    },
    /// What the agent answered.
    AiResponse {
        #[serde(default)]
        text: Option<String>,
    },
    StateChange {
        #[serde(default)]
        state: Option<RemoteState>,
    },
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Everything the duplex channel can hand back to its owner, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Raw PCM16 little-endian speech.
    Binary(Vec<u8>),
    /// A JSON control message, not yet parsed.
    Text(String),
    /// The remote side closed or the connection failed. Never sent after an
    /// intentional close.
    Closed { reason: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_known_messages() {
        let msg = ControlMessage::from_json(r#"{"type":"CLEAR_BUFFER"}"#).unwrap();
        assert_eq!(msg, ControlMessage::ClearBuffer);

        let msg = ControlMessage::from_json(r#"{"type":"TRANSCRIPT","text":"hello"}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::Transcript {
                text: Some("hello".to_string())
            }
        );

        let msg = ControlMessage::from_json(r#"{"type":"AI_RESPONSE","text":"hi there"}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::AiResponse {
                text: Some("hi there".to_string())
            }
        );

        let msg = ControlMessage::from_json(r#"{"type":"STATE_CHANGE","state":"PROCESSING"}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::StateChange {
                state: Some(RemoteState::Processing)
            }
        );
    }

    #[test]
    fn test_unknown_values_do_not_fail() {
        let msg = ControlMessage::from_json(r#"{"type":"PING","seq":4}"#).unwrap();
        assert_eq!(msg, ControlMessage::Unknown);

        let msg = ControlMessage::from_json(r#"{"type":"STATE_CHANGE","state":"THINKING"}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::StateChange {
                state: Some(RemoteState::Unknown)
            }
        );

        let msg = ControlMessage::from_json(r#"{"type":"TRANSCRIPT"}"#).unwrap();
        assert_eq!(msg, ControlMessage::Transcript { text: None });
    }

    #[test]
    fn test_malformed_text_is_an_error() {
        assert!(ControlMessage::from_json("not json").is_err());
        assert!(ControlMessage::from_json(r#"{"text":"no type"}"#).is_err());
    }
}
