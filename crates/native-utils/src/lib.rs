pub mod audio;
pub mod capture;
pub mod device;
pub mod playback;

pub use capture::MicrophoneCapture;
pub use playback::{PlaybackHandle, SpeakerPlayback};
