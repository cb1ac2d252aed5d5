use crate::client::stats::Stats;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use verba_types::TransportEvent;

pub(crate) mod config;
mod consts;
pub(crate) mod stats;
mod utils;

type ClientTx = tokio::sync::mpsc::Sender<Message>;
type ServerTx = tokio::sync::mpsc::Sender<TransportEvent>;
pub type ServerRx = tokio::sync::mpsc::Receiver<TransportEvent>;

/// Lifecycle of one duplex connection. Connecting is the pending
/// `connect` future itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Open,
    Closed,
}

// Everything that belongs to a single open channel. A reconnect builds a new
// one, so tasks of an old channel can never touch the state of the next.
struct Connection {
    c_tx: Option<ClientTx>,
    state: Arc<Mutex<TransportState>>,
    closing: Arc<AtomicBool>,
    recv_handle: tokio::task::JoinHandle<()>,
}

pub struct Client {
    config: config::Config,
    connection: Option<Connection>,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    pub fn new(config: config::Config) -> Self {
        Self {
            config,
            connection: None,
            stats: Arc::new(Mutex::new(Stats::new())),
        }
    }

    pub fn config(&self) -> &config::Config {
        &self.config
    }

    pub fn state(&self) -> TransportState {
        match self.connection {
            Some(ref connection) => connection
                .state
                .lock()
                .map(|state| *state)
                .unwrap_or(TransportState::Closed),
            None => TransportState::Idle,
        }
    }

    /// Opens the channel. Resolves once the handshake completes and returns
    /// the receiver for inbound events, in arrival order.
    pub async fn connect(&mut self) -> Result<ServerRx> {
        if self.state() == TransportState::Open {
            return Err(anyhow::anyhow!("already connected"));
        }
        // Tear down whatever is left of a previous, closed channel.
        self.close();

        let request = utils::build_request(&self.config)?;
        tracing::info!("Connecting to {}", self.config.url());

        let handshake = tokio::time::timeout(
            self.config.connect_timeout(),
            tokio_tungstenite::connect_async(request),
        )
        .await;
        let ws_stream = match handshake {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                return Err(e).with_context(|| format!("Failed to connect to {}", self.config.url()));
            }
            Err(_) => {
                return Err(anyhow::anyhow!(
                    "Timed out connecting to {} after {:?}",
                    self.config.url(),
                    self.config.connect_timeout()
                ));
            }
        };

        // Open before the reader exists, so an immediate remote close wins.
        let state = Arc::new(Mutex::new(TransportState::Open));

        // Split the WebSocket into read and write halves.
        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<Message>(self.config.capacity());
        let (s_tx, s_rx): (ServerTx, ServerRx) =
            tokio::sync::mpsc::channel(self.config.capacity());
        let closing = Arc::new(AtomicBool::new(false));

        // Drains the outbound queue. When every sender is gone the channel is
        // being closed on purpose, so finish with a close frame.
        tokio::spawn(async move {
            while let Some(message) = c_rx.recv().await {
                if let Err(e) = write.send(message).await {
                    tracing::error!("failed to send message: {}", e);
                    break;
                }
            }
            if let Err(e) = write.close().await {
                tracing::debug!("failed to close writer: {}", e);
            }
        });

        let stats = self.stats.clone();
        let recv_state = state.clone();
        let recv_closing = closing.clone();
        let recv_handle = tokio::spawn(async move {
            let reason = loop {
                let message = match read.next().await {
                    None => break None,
                    Some(Err(e)) => {
                        tracing::error!("failed to read message: {}", e);
                        break Some(e.to_string());
                    }
                    Some(Ok(message)) => message,
                };
                let event = match message {
                    Message::Text(text) => {
                        if let Ok(mut stats_guard) = stats.lock() {
                            stats_guard.record_text();
                        }
                        tracing::debug!("received text message: {} bytes", text.len());
                        TransportEvent::Text(text)
                    }
                    Message::Binary(bin) => {
                        if let Ok(mut stats_guard) = stats.lock() {
                            stats_guard.record_binary();
                        }
                        tracing::debug!("received binary message: {} bytes", bin.len());
                        TransportEvent::Binary(bin)
                    }
                    Message::Close(frame) => {
                        tracing::info!("connection closed: {:?}", frame);
                        break frame.map(|f| format!("{:?}: {}", f.code, f.reason));
                    }
                    _ => continue,
                };
                if s_tx.send(event).await.is_err() {
                    tracing::debug!("event receiver dropped, stopping reader");
                    break None;
                }
            };

            if let Ok(mut state) = recv_state.lock() {
                *state = TransportState::Closed;
            }
            if !recv_closing.load(Ordering::SeqCst) {
                tracing::warn!("connection lost: {:?}", reason);
                if let Err(e) = s_tx.send(TransportEvent::Closed { reason }).await {
                    tracing::debug!("failed to report close: {}", e);
                }
            }
        });

        self.connection = Some(Connection {
            c_tx: Some(c_tx),
            state,
            closing,
            recv_handle,
        });
        tracing::info!("Connected to {}", self.config.url());
        Ok(s_rx)
    }

    /// Queues a binary frame. Fire and forget: frames are silently dropped
    /// when the channel is not open and counted when the queue is full.
    pub fn send_binary(&self, bytes: Vec<u8>) {
        if self.state() != TransportState::Open {
            return;
        }
        let Some(c_tx) = self.connection.as_ref().and_then(|c| c.c_tx.as_ref()) else {
            return;
        };
        let len = bytes.len();
        match c_tx.try_send(Message::Binary(bytes)) {
            Ok(()) => {
                if let Ok(mut stats_guard) = self.stats.lock() {
                    stats_guard.record_sent(len);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                if let Ok(mut stats_guard) = self.stats.lock() {
                    stats_guard.record_dropped();
                }
                tracing::warn!("outbound queue full, dropping {} byte frame", len);
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("writer gone, dropping {} byte frame", len);
            }
        }
    }

    /// Intentional close. No `Closed` event is emitted for it.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.as_mut() {
            connection.closing.store(true, Ordering::SeqCst);
            if let Ok(mut state) = connection.state.lock() {
                if *state != TransportState::Closed {
                    tracing::info!("Closing connection to {}", self.config.url());
                }
                *state = TransportState::Closed;
            }
            connection.recv_handle.abort();
            // Dropping the sender lets the writer send its close frame.
            connection.c_tx = None;
        }
    }

    // Return a copy of the traffic counters.
    pub fn stats(&self) -> Result<Stats> {
        if let Ok(stats_guard) = self.stats.lock() {
            Ok(stats_guard.clone())
        } else {
            Err(anyhow::anyhow!("failed to get stats"))
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

// Public function to create a client with specific config and connect.
pub async fn connect_with_config(config: config::Config) -> Result<(Client, ServerRx)> {
    let mut client = Client::new(config);
    let events = client.connect().await?;
    Ok((client, events))
}
