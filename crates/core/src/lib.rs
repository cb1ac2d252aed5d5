//! Conversation logic of the voice client, independent of any audio device
//! or network library.

pub mod error;
pub mod events;
pub mod pipeline;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transcript;
pub mod transport;
pub mod voice;

pub use error::SessionError;
pub use events::SessionEvent;
pub use pipeline::{CapturePipeline, FrameCallback, PlaybackPipeline};
pub use protocol::InterruptPolicy;
pub use session::{ConversationSession, SessionConfig, SessionInput};
pub use transport::Transport;
pub use voice::{VoiceClient, VoiceSettings};
