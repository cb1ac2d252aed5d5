use verba_types::{ConversationState, Message};

/// Broadcast to every presentation-layer subscriber of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(ConversationState),
    MessageAdded(Message),
    /// A short user-facing message. Fatal ones come with `StateChanged(Error)`.
    Error(String),
}
