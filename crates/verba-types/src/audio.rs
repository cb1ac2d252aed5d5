/// Sample rate of every PCM16 frame on the wire, in both directions.
pub const WIRE_SAMPLE_RATE: u32 = 16000;

/// Samples per captured frame sent upstream.
pub const CAPTURE_FRAME_SIZE: usize = 4096;

/// A captured, wire-ready frame of signed 16-bit samples.
pub type Pcm16Frame = Vec<i16>;
