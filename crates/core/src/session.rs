//! The conversation session: owns the capture and playback pipelines, the
//! transport and the conversation state, and drives all of them from one
//! task.
//!
//! Nothing here spawns. The owner waits on
//! [`ConversationSession::next_input`] (usually inside a `tokio::select!`
//! with its own inputs) and passes the result to
//! [`ConversationSession::handle`]. Captured frames, inbound events and the
//! reconnect deadline are handled one at a time, inbound events in arrival
//! order.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Sleep;
use verba_types::audio::Pcm16Frame;
use verba_types::{ConversationState, Message, Sender, TransportEvent};

use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::pipeline::{CapturePipeline, PlaybackPipeline};
use crate::protocol::{self, Effect, InterruptPolicy};
use crate::state::StateMachine;
use crate::transcript::Transcript;
use crate::transport::Transport;
use crate::voice::VoiceSettings;

pub const RECONNECT_DELAY_MS: u64 = 3000;
pub const DEFAULT_GREETING: &str =
    "¡Hola! Estoy lista para ayudarte a practicar inglés. ¿De qué te gustaría hablar?";
pub const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 128;

pub const MICROPHONE_ERROR: &str = "Failed to access microphone. Please grant permission.";
pub const CONNECT_ERROR: &str = "Connection error. Please check if the backend is running.";
pub const CONNECTION_LOST: &str = "Connection lost. Attempting to reconnect...";
pub const VOICE_ERROR: &str = "Failed to change voice";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub reconnect_delay: Duration,
    /// First AI message of every successful start.
    pub greeting: String,
    pub interrupt_policy: InterruptPolicy,
    /// Captured frames waiting for the session loop. Newest frames are
    /// dropped when full.
    pub frame_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(RECONNECT_DELAY_MS),
            greeting: DEFAULT_GREETING.to_string(),
            interrupt_policy: InterruptPolicy::default(),
            frame_queue_capacity: DEFAULT_FRAME_QUEUE_CAPACITY,
        }
    }
}

/// One unit of work for the session, as returned by
/// [`ConversationSession::next_input`].
#[derive(Debug)]
pub enum SessionInput {
    Frame(Pcm16Frame),
    Transport(TransportEvent),
    Reconnect,
}

pub struct ConversationSession {
    config: SessionConfig,
    machine: StateMachine,
    transcript: Transcript,
    last_error: Option<String>,
    capture: Box<dyn CapturePipeline>,
    playback: Box<dyn PlaybackPipeline>,
    transport: Box<dyn Transport>,
    voice: Arc<dyn VoiceSettings>,
    inbound: Option<mpsc::Receiver<TransportEvent>>,
    frames_tx: mpsc::Sender<Pcm16Frame>,
    frames_rx: mpsc::Receiver<Pcm16Frame>,
    reconnect: Option<Pin<Box<Sleep>>>,
    // Set by the first open after `stop`; a failed connect after that is a
    // dropped connection, not a startup failure.
    has_connected: bool,
    events: broadcast::Sender<SessionEvent>,
}

impl ConversationSession {
    pub fn new(
        config: SessionConfig,
        capture: Box<dyn CapturePipeline>,
        playback: Box<dyn PlaybackPipeline>,
        transport: Box<dyn Transport>,
        voice: Arc<dyn VoiceSettings>,
    ) -> Self {
        let (frames_tx, frames_rx) = mpsc::channel(config.frame_queue_capacity.max(1));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            machine: StateMachine::new(events.clone()),
            transcript: Transcript::new(),
            last_error: None,
            capture,
            playback,
            transport,
            voice,
            inbound: None,
            frames_tx,
            frames_rx,
            reconnect: None,
            has_connected: false,
            events,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> ConversationState {
        self.machine.current()
    }

    pub fn transcript(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.reconnect.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn transport_stats(&self) -> Option<String> {
        self.transport.stats()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Audio segments queued or still audible.
    pub fn pending_playback(&self) -> usize {
        self.playback.pending()
    }

    /// Acquires the microphone, opens the transport and starts streaming.
    ///
    /// Only valid from `disconnected` or `error`. Any failure leaves the
    /// session in `error` with a short message in `last_error`.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        let current = self.state();
        if !current.is_idle() {
            tracing::warn!("start() ignored, session is {}", current);
            return Err(SessionError::AlreadyActive(current));
        }

        // A connect attempt and a reconnect timer never coexist.
        self.cancel_reconnect();
        self.machine.transition(ConversationState::Connecting);
        self.last_error = None;

        if !self.capture.is_initialized() {
            if let Err(e) = self.capture.initialize() {
                tracing::error!("Error initializing microphone: {:?}", e);
                return Err(self.fail(SessionError::Microphone(MICROPHONE_ERROR.to_string())));
            }
        }

        let inbound = match self.transport.connect().await {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::error!("Error connecting: {:?}", e);
                if self.has_connected {
                    self.connection_lost();
                    return Err(SessionError::Connect(CONNECTION_LOST.to_string()));
                }
                return Err(self.fail(SessionError::Connect(CONNECT_ERROR.to_string())));
            }
        };
        self.inbound = Some(inbound);
        self.has_connected = true;
        self.machine.transition(ConversationState::Listening);

        if self.capture.is_capturing() {
            self.capture.stop_capture();
        }
        let frames_tx = self.frames_tx.clone();
        let on_frame = Box::new(move |frame: Pcm16Frame| {
            if let Err(mpsc::error::TrySendError::Full(_)) = frames_tx.try_send(frame) {
                tracing::warn!("frame queue full, dropping captured frame");
            }
        });
        if let Err(e) = self.capture.start_capture(on_frame) {
            tracing::error!("Error starting capture: {:?}", e);
            self.transport.close();
            self.inbound = None;
            return Err(self.fail(SessionError::Microphone(MICROPHONE_ERROR.to_string())));
        }

        tracing::info!("Conversation started");
        let greeting = self.config.greeting.clone();
        self.append(Sender::Ai, &greeting);
        Ok(())
    }

    /// Tears everything down and returns to `disconnected`. No reconnect
    /// follows. Safe to call in any state, any number of times.
    pub fn stop(&mut self) {
        tracing::info!("Stopping conversation");
        self.cancel_reconnect();
        self.capture.stop_capture();
        self.transport.close();
        self.inbound = None;
        self.capture.cleanup();
        self.playback.cleanup();
        self.drain_frames();
        self.has_connected = false;
        self.machine.transition(ConversationState::Disconnected);
    }

    /// Changes the synthesis voice. A failure is reported through
    /// `last_error` and a `SessionEvent::Error` but leaves the state alone.
    pub async fn set_voice(&mut self, voice_id: &str) -> Result<(), SessionError> {
        match self.voice.set_voice(voice_id).await {
            Ok(_) => {
                tracing::info!("Voice set to: {}", voice_id);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error setting voice: {:?}", e);
                self.report_error(VOICE_ERROR);
                Err(SessionError::VoiceChange(VOICE_ERROR.to_string()))
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        self.voice.health_check().await
    }

    /// Waits for the next captured frame, inbound event or reconnect
    /// deadline. Cancel safe: dropping the future loses nothing, so it can sit
    /// in a `tokio::select!` next to other inputs.
    pub async fn next_input(&mut self) -> SessionInput {
        tokio::select! {
            Some(frame) = self.frames_rx.recv() => SessionInput::Frame(frame),
            event = next_inbound(&mut self.inbound) => SessionInput::Transport(event),
            () = wait_reconnect(&mut self.reconnect) => SessionInput::Reconnect,
        }
    }

    /// Handles one input. Not cancel safe: a reconnect awaits `start`.
    pub async fn handle(&mut self, input: SessionInput) {
        match input {
            SessionInput::Frame(frame) => {
                if self.transport.is_open() {
                    self.transport.send_audio(&frame);
                }
            }
            SessionInput::Transport(event) => self.handle_transport_event(event),
            SessionInput::Reconnect => {
                self.reconnect = None;
                tracing::info!("Attempting to reconnect...");
                if let Err(e) = self.start().await {
                    tracing::warn!("Reconnect failed: {}", e);
                }
            }
        }
    }

    pub async fn step(&mut self) {
        let input = self.next_input().await;
        self.handle(input).await;
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Binary(data) => {
                self.machine.transition(ConversationState::Speaking);
                if let Err(e) = self.playback.enqueue(&data) {
                    tracing::error!("Error playing audio: {:?}", e);
                }
            }
            TransportEvent::Text(text) => {
                if let Some(message) = protocol::parse(&text) {
                    tracing::debug!("Control message: {:?}", message);
                    let effects =
                        protocol::interpret(&message, self.state(), self.config.interrupt_policy);
                    for effect in effects {
                        self.apply(effect);
                    }
                }
            }
            TransportEvent::Closed { reason } => {
                tracing::info!("Transport disconnected: {:?}", reason);
                self.inbound = None;
                if self.state() != ConversationState::Disconnected {
                    self.connection_lost();
                }
            }
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::ClearPlayback => self.playback.clear(),
            Effect::Transition(next) => {
                self.machine.transition(next);
            }
            Effect::Append(sender, text) => self.append(sender, &text),
        }
    }

    fn append(&mut self, sender: Sender, text: &str) {
        let message = self.transcript.push(sender, text);
        let _ = self.events.send(SessionEvent::MessageAdded(message));
    }

    // Unsolicited close: stop streaming and retry after the configured delay.
    fn connection_lost(&mut self) {
        self.capture.stop_capture();
        self.transport.close();
        self.inbound = None;
        // Frames captured before the drop belong to the lost connection.
        self.drain_frames();
        self.report_error(CONNECTION_LOST);
        self.machine.transition(ConversationState::Error);
        self.schedule_reconnect();
    }

    fn drain_frames(&mut self) {
        while self.frames_rx.try_recv().is_ok() {}
    }

    fn schedule_reconnect(&mut self) {
        // Replacing the timer cancels the previous one.
        self.reconnect = Some(Box::pin(tokio::time::sleep(self.config.reconnect_delay)));
        tracing::info!("Reconnecting in {:?}", self.config.reconnect_delay);
    }

    fn cancel_reconnect(&mut self) {
        if self.reconnect.take().is_some() {
            tracing::debug!("Pending reconnect cancelled");
        }
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        self.report_error(&error.to_string());
        self.machine.transition(ConversationState::Error);
        error
    }

    fn report_error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        let _ = self.events.send(SessionEvent::Error(message.to_string()));
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn next_inbound(inbound: &mut Option<mpsc::Receiver<TransportEvent>>) -> TransportEvent {
    match inbound {
        // A receiver that ends without a close event is a close all the same.
        Some(rx) => rx
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed { reason: None }),
        None => std::future::pending().await,
    }
}

async fn wait_reconnect(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
