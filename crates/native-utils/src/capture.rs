//! Microphone capture: device-rate float audio in, 16 kHz PCM16 frames out.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, Stream, StreamConfig};
use verba_types::audio::{CAPTURE_FRAME_SIZE, WIRE_SAMPLE_RATE};

use crate::audio;
use crate::device;

/// The size of each audio chunk delivered by the microphone input stream.
pub const INPUT_CHUNK_SIZE: usize = 1024;

type Tap = Box<dyn FnMut(Vec<i16>) + Send>;

/// Turns arbitrary-sized mono blocks at the device rate into fixed-size
/// wire frames.
pub struct FrameAssembler {
    frame_size: usize,
    resampler: Option<audio::ChunkedResampler>,
    frame: VecDeque<f32>,
}

impl FrameAssembler {
    pub fn new(device_sample_rate: u32, frame_size: usize) -> anyhow::Result<Self> {
        let resampler = if device_sample_rate == WIRE_SAMPLE_RATE {
            None
        } else {
            Some(audio::ChunkedResampler::new(audio::create_resampler(
                device_sample_rate as f64,
                WIRE_SAMPLE_RATE as f64,
                INPUT_CHUNK_SIZE,
            )?))
        };
        Ok(Self {
            frame_size,
            resampler,
            frame: VecDeque::with_capacity(frame_size * 2),
        })
    }

    /// Feeds mono samples and returns every frame completed by them.
    pub fn push(&mut self, mono: &[f32]) -> Vec<Vec<i16>> {
        match self.resampler.as_mut() {
            Some(resampler) => self.frame.extend(resampler.push(mono)),
            None => self.frame.extend(mono),
        }

        let mut frames = Vec::new();
        while self.frame.len() >= self.frame_size {
            let samples: Vec<f32> = self.frame.drain(..self.frame_size).collect();
            frames.push(audio::encode_f32(&samples));
        }
        frames
    }

    /// Drops any partial frame.
    pub fn reset(&mut self) {
        self.frame.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }
}

struct TapState {
    tap: Option<Tap>,
    assembler: FrameAssembler,
}

/// Owns one input stream. The device is held from `initialize` until
/// `cleanup`; frames only flow while a tap is attached.
pub struct MicrophoneCapture {
    device_name: Option<String>,
    stream: Option<Stream>,
    shared: Option<Arc<Mutex<TapState>>>,
}

impl MicrophoneCapture {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stream: None,
            shared: None,
        }
    }

    /// Opens the microphone and starts the underlying stream.
    pub fn initialize(&mut self) -> anyhow::Result<()> {
        if self.stream.is_some() {
            tracing::debug!("Microphone already initialized");
            return Ok(());
        }

        let input = device::get_or_default_input(self.device_name.as_deref())
            .context("Failed to access microphone. Please grant permission.")?;
        tracing::info!("Using input device: {:?}", input.name().unwrap_or_default());

        let input_config = input
            .default_input_config()
            .context("Failed to get default input config")?;
        let input_config = StreamConfig {
            channels: input_config.channels(),
            sample_rate: input_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
        };
        tracing::info!("Input stream config: {:?}", &input_config);

        let shared = Arc::new(Mutex::new(TapState {
            tap: None,
            assembler: FrameAssembler::new(input_config.sample_rate.0, CAPTURE_FRAME_SIZE)?,
        }));
        let channels = input_config.channels as usize;

        let stream = match input.build_input_stream(
            &input_config,
            input_callback(channels, shared.clone()),
            |err| tracing::error!("An error occurred on input stream: {}", err),
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                // Some hosts refuse a fixed buffer size.
                tracing::warn!("Fixed input buffer rejected ({}), retrying with default", e);
                let fallback = StreamConfig {
                    buffer_size: cpal::BufferSize::Default,
                    ..input_config
                };
                input
                    .build_input_stream(
                        &fallback,
                        input_callback(channels, shared.clone()),
                        |err| tracing::error!("An error occurred on input stream: {}", err),
                        None,
                    )
                    .context("Failed to open microphone stream")?
            }
        };
        stream.play().context("Failed to start microphone stream")?;

        self.stream = Some(stream);
        self.shared = Some(shared);
        tracing::info!("Microphone initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.stream.is_some()
    }

    /// Attaches `on_frame`. Fails if the microphone is not initialized or a
    /// tap is already attached.
    pub fn start_capture<F>(&mut self, on_frame: F) -> anyhow::Result<()>
    where
        F: FnMut(Vec<i16>) + Send + 'static,
    {
        let shared = self
            .shared
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Microphone not initialized"))?;
        let mut state = shared
            .lock()
            .map_err(|_| anyhow::anyhow!("Capture state poisoned"))?;
        if state.tap.is_some() {
            return Err(anyhow::anyhow!("Capture already started"));
        }
        state.assembler.reset();
        state.tap = Some(Box::new(on_frame));
        tracing::info!("Audio capture started");
        Ok(())
    }

    pub fn is_capturing(&self) -> bool {
        self.shared
            .as_ref()
            .and_then(|s| s.lock().ok().map(|state| state.tap.is_some()))
            .unwrap_or(false)
    }

    /// Detaches the tap but keeps the device open.
    pub fn stop_capture(&mut self) {
        if let Some(shared) = self.shared.as_ref() {
            if let Ok(mut state) = shared.lock() {
                if state.tap.take().is_some() {
                    tracing::info!("Audio capture stopped");
                }
                state.assembler.reset();
            }
        }
    }

    /// Releases the device. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.stop_capture();
        self.shared = None;
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::info!("Microphone released");
        }
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn input_callback(
    channels: usize,
    shared: Arc<Mutex<TapState>>,
) -> impl FnMut(&[f32], &cpal::InputCallbackInfo) + Send + 'static {
    move |data: &[f32], _: &cpal::InputCallbackInfo| {
        let Ok(mut state) = shared.lock() else {
            return;
        };
        if state.tap.is_none() {
            return;
        }
        let mono = audio::downmix(data, channels);
        let frames = state.assembler.push(&mono);
        if let Some(tap) = state.tap.as_mut() {
            for frame in frames {
                tap(frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembles_fixed_frames_at_wire_rate() {
        let mut assembler = FrameAssembler::new(WIRE_SAMPLE_RATE, CAPTURE_FRAME_SIZE).unwrap();

        let frames = assembler.push(&vec![0.5; 5000]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), CAPTURE_FRAME_SIZE);
        assert!(frames[0].iter().all(|&s| s == 16383));

        // 904 samples are carried over; 3192 more complete the next frame.
        assert!(assembler.push(&vec![0.0; 3191]).is_empty());
        let frames = assembler.push(&[0.0]);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut assembler = FrameAssembler::new(WIRE_SAMPLE_RATE, 4).unwrap();
        assert!(assembler.push(&[0.1, 0.2, 0.3]).is_empty());
        assembler.reset();
        assert!(assembler.push(&[0.1, 0.2, 0.3]).is_empty());
        assert_eq!(assembler.push(&[0.4]).len(), 1);
    }

    #[test]
    fn test_resamples_device_rate_down() {
        let mut assembler = FrameAssembler::new(48000, CAPTURE_FRAME_SIZE).unwrap();
        let frames = assembler.push(&vec![0.0; 48000]);
        assert!(frames.len() >= 3, "got {} frames", frames.len());
        assert!(frames.iter().all(|f| f.len() == CAPTURE_FRAME_SIZE));
    }

    #[test]
    fn test_start_requires_initialize() {
        let mut capture = MicrophoneCapture::new(None);
        assert!(capture.start_capture(|_| {}).is_err());
        assert!(!capture.is_capturing());
        capture.cleanup();
        capture.cleanup();
    }
}
