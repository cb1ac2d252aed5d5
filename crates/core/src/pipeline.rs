//! Seams to the audio hardware. The native implementations live in
//! `verba-native-utils`; the session only ever sees these traits.

use anyhow::Result;
use verba_types::audio::Pcm16Frame;

/// Receives every assembled 4096-sample capture frame.
pub type FrameCallback = Box<dyn FnMut(Pcm16Frame) + Send>;

pub trait CapturePipeline {
    /// Acquires the microphone. Fails when access is denied.
    fn initialize(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Starts delivering frames to `on_frame`.
    fn start_capture(&mut self, on_frame: FrameCallback) -> Result<()>;

    fn is_capturing(&self) -> bool;

    /// Stops frame delivery. The device stays acquired.
    fn stop_capture(&mut self);

    /// Releases the device. Safe to call repeatedly.
    fn cleanup(&mut self);
}

pub trait PlaybackPipeline {
    /// Schedules one PCM16 LE segment after everything already queued.
    fn enqueue(&mut self, segment: &[u8]) -> Result<()>;

    /// Stops and discards every scheduled segment.
    fn clear(&mut self);

    /// Segments queued or still audible.
    fn pending(&self) -> usize;

    fn cleanup(&mut self);
}
