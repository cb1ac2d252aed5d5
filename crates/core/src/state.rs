use tokio::sync::broadcast;
use verba_types::ConversationState;

use crate::events::SessionEvent;

/// Sole owner of the conversation state. Every change is broadcast as
/// `SessionEvent::StateChanged`.
pub struct StateMachine {
    state: ConversationState,
    events: broadcast::Sender<SessionEvent>,
}

impl StateMachine {
    pub fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            state: ConversationState::default(),
            events,
        }
    }

    pub fn current(&self) -> ConversationState {
        self.state
    }

    /// Moves to `next`. Returns false (and stays quiet) when already there.
    pub fn transition(&mut self, next: ConversationState) -> bool {
        if self.state == next {
            return false;
        }
        tracing::debug!("state: {} -> {}", self.state, next);
        self.state = next;
        // Nobody listening is fine.
        let _ = self.events.send(SessionEvent::StateChanged(next));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_real_changes_are_broadcast() {
        let (tx, mut rx) = broadcast::channel(8);
        let mut machine = StateMachine::new(tx);
        assert_eq!(machine.current(), ConversationState::Disconnected);

        assert!(machine.transition(ConversationState::Connecting));
        assert!(!machine.transition(ConversationState::Connecting));
        assert!(machine.transition(ConversationState::Listening));

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::StateChanged(ConversationState::Connecting)
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::StateChanged(ConversationState::Listening)
        );
        assert!(rx.try_recv().is_err());
    }
}
