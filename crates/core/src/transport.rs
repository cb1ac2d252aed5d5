use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use verba_types::TransportEvent;

/// A duplex message channel to the conversation backend.
///
/// Inbound traffic is delivered through the receiver returned by `connect`,
/// in arrival order. A `TransportEvent::Closed` (or the receiver ending) is
/// only reported for closes the session did not ask for.
#[async_trait]
pub trait Transport: Send {
    /// Opens the channel. Resolves once it is open, or fails.
    async fn connect(&mut self) -> Result<mpsc::Receiver<TransportEvent>>;

    /// Sends one PCM16 frame as a binary message. Dropped when not open.
    fn send_audio(&mut self, frame: &[i16]);

    /// Intentional close. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Human readable traffic counters, when the channel keeps any.
    fn stats(&self) -> Option<String> {
        None
    }
}
