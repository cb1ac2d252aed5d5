//now people using the types library can use these types
pub mod audio;
pub mod conversation;
pub mod events;
pub mod voice;

//re-export types for easier access
pub use conversation::{ConversationState, Message, Sender};
pub use events::{ControlMessage, RemoteState, TransportEvent};
pub use voice::{SetVoiceRequest, SetVoiceResponse};
