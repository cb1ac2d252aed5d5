use verba_types::ConversationState;

/// Failures surfaced to the presentation layer. Everything else is absorbed
/// and logged where it happens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The microphone could not be acquired or tapped.
    #[error("{0}")]
    Microphone(String),
    /// The duplex channel did not open.
    #[error("{0}")]
    Connect(String),
    #[error("session already active ({0})")]
    AlreadyActive(ConversationState),
    #[error("{0}")]
    VoiceChange(String),
}
