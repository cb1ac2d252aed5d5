use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use verba_core::Transport;
use verba_native_utils::audio::ToBinary;
use verba_realtime::types::TransportEvent;
use verba_realtime::{Client, TransportState};

/// An adapter that implements the session's `Transport` for the
/// `verba_realtime::Client` WebSocket client.
pub struct RealtimeTransport {
    client: Client,
}

impl RealtimeTransport {
    pub fn new(config: verba_realtime::Config) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl Transport for RealtimeTransport {
    async fn connect(&mut self) -> Result<mpsc::Receiver<TransportEvent>> {
        let url = self.client.config().url().to_string();
        self.client
            .connect()
            .await
            .with_context(|| format!("Failed to open conversation channel at {}", url))
    }

    fn send_audio(&mut self, frame: &[i16]) {
        self.client.send_binary(frame.to_binary());
    }

    fn close(&mut self) {
        self.client.close();
    }

    fn is_open(&self) -> bool {
        self.client.state() == TransportState::Open
    }

    fn stats(&self) -> Option<String> {
        let stats = self.client.stats().ok()?;
        Some(format!(
            "sent {} frames ({} bytes), dropped {}, received {} audio / {} control messages",
            stats.frames_sent(),
            stats.bytes_sent(),
            stats.frames_dropped(),
            stats.binary_received(),
            stats.text_received()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unreachable_backend() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = verba_realtime::Config::builder()
            .with_url(&format!("ws://{addr}/ws"))
            .with_connect_timeout(Duration::from_secs(2))
            .build();
        let mut transport = RealtimeTransport::new(config);
        assert!(transport.connect().await.is_err());
        assert!(!transport.is_open());

        transport.send_audio(&[1, 2, 3]);
        let stats = transport.stats().unwrap();
        assert!(stats.starts_with("sent 0 frames"), "got {stats}");
        transport.close();
    }
}
