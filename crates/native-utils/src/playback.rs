//! Speaker playback of inbound PCM16 segments.
//!
//! Segments are appended to a ring buffer drained by the output stream, so
//! they play back to back in arrival order. `clear` tears the whole output
//! context down; the next `enqueue` builds a fresh one. Nothing scheduled
//! before a clear can reach the speaker afterwards.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, Stream, StreamConfig};
use ringbuf::HeapProd;
use ringbuf::traits::{Consumer, Producer, Split};
use verba_types::audio::WIRE_SAMPLE_RATE;

use crate::audio;
use crate::device;

/// The size of each audio chunk for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;
/// Seconds of speech the output buffer can hold ahead of the speaker.
pub const OUTPUT_BUFFER_SECS: usize = 60;
const OUTPUT_RESAMPLE_CHUNK: usize = 100;

/// Opaque reference to one scheduled segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(u64);

/// Bookkeeping of which segments are still queued or audible, measured in
/// samples written vs. samples played.
#[derive(Debug, Default)]
pub struct SegmentQueue {
    next_id: u64,
    written: u64,
    segments: VecDeque<(PlaybackHandle, u64)>,
}

impl SegmentQueue {
    pub fn schedule(&mut self, samples: usize) -> PlaybackHandle {
        let handle = PlaybackHandle(self.next_id);
        self.next_id += 1;
        self.written += samples as u64;
        self.segments.push_back((handle, self.written));
        handle
    }

    /// Segments not fully played once `played` samples have been consumed.
    pub fn active(&self, played: u64) -> Vec<PlaybackHandle> {
        self.segments
            .iter()
            .filter(|(_, end)| *end > played)
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// Forgets every segment. Sample positions restart from zero because the
    /// next context starts with an empty buffer.
    pub fn clear(&mut self) -> usize {
        let dropped = self.segments.len();
        self.segments.clear();
        self.written = 0;
        dropped
    }
}

struct PlaybackContext {
    // Dropping the stream stops the device callback immediately.
    _stream: Stream,
    producer: HeapProd<f32>,
    // Carries partial chunks over between segments.
    resampler: Option<audio::ChunkedResampler>,
    played: Arc<AtomicU64>,
}

pub struct SpeakerPlayback {
    device_name: Option<String>,
    context: Option<PlaybackContext>,
    queue: SegmentQueue,
}

impl SpeakerPlayback {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            context: None,
            queue: SegmentQueue::default(),
        }
    }

    /// Schedules `frame` (PCM16 LE, 16 kHz mono) right after whatever is
    /// already queued.
    pub fn enqueue(&mut self, frame: &[u8]) -> anyhow::Result<PlaybackHandle> {
        let pcm16 = audio::pcm16_from_le_bytes(frame);
        if pcm16.is_empty() {
            return Err(anyhow::anyhow!("Empty audio segment"));
        }

        let context = self.ensure_context()?;
        let samples = audio::decode_i16(&pcm16);
        let samples = match context.resampler.as_mut() {
            Some(resampler) => resampler.push(&samples),
            None => samples,
        };

        let pushed = context.producer.push_slice(&samples);
        if pushed < samples.len() {
            tracing::warn!(
                "Output buffer full, dropped {} of {} samples",
                samples.len() - pushed,
                samples.len()
            );
        }
        let handle = self.queue.schedule(pushed);
        tracing::debug!("Scheduled segment {:?} ({} samples)", handle, pushed);
        Ok(handle)
    }

    /// Handles of segments that are queued or still playing.
    pub fn active(&self) -> Vec<PlaybackHandle> {
        let played = self
            .context
            .as_ref()
            .map(|c| c.played.load(Ordering::Relaxed))
            .unwrap_or(u64::MAX);
        self.queue.active(played)
    }

    /// Stops everything scheduled and discards the output context.
    pub fn clear(&mut self) {
        let had_context = self.context.take().is_some();
        let dropped = self.queue.clear();
        if had_context || dropped > 0 {
            tracing::info!("Playback buffer cleared ({} segments discarded)", dropped);
        }
    }

    /// Releases the output device. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        if self.context.is_some() {
            self.clear();
            tracing::info!("Playback released");
        }
    }

    fn ensure_context(&mut self) -> anyhow::Result<&mut PlaybackContext> {
        if self.context.is_none() {
            self.context = Some(self.open_context()?);
        }
        self.context
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Playback context unavailable"))
    }

    fn open_context(&self) -> anyhow::Result<PlaybackContext> {
        let output = device::get_or_default_output(self.device_name.as_deref())
            .context("Failed to get audio output device")?;
        tracing::debug!("Using output device: {:?}", output.name().unwrap_or_default());

        let output_config = output
            .default_output_config()
            .context("Failed to get default output config")?;
        let output_config = StreamConfig {
            channels: output_config.channels(),
            sample_rate: output_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
        };
        let output_sample_rate = output_config.sample_rate.0;
        let channels = output_config.channels as usize;

        let (producer, consumer) =
            audio::shared_buffer(output_sample_rate as usize * OUTPUT_BUFFER_SECS).split();
        let played = Arc::new(AtomicU64::new(0));

        let resampler = if output_sample_rate == WIRE_SAMPLE_RATE {
            None
        } else {
            Some(audio::ChunkedResampler::new(audio::create_resampler(
                WIRE_SAMPLE_RATE as f64,
                output_sample_rate as f64,
                OUTPUT_RESAMPLE_CHUNK,
            )?))
        };

        let consumer = Arc::new(std::sync::Mutex::new(consumer));
        let stream = match output.build_output_stream(
            &output_config,
            output_callback(channels, consumer.clone(), played.clone()),
            |err| tracing::error!("An error occurred on output stream: {}", err),
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Fixed output buffer rejected ({}), retrying with default", e);
                let fallback = StreamConfig {
                    buffer_size: cpal::BufferSize::Default,
                    ..output_config
                };
                output
                    .build_output_stream(
                        &fallback,
                        output_callback(channels, consumer.clone(), played.clone()),
                        |err| tracing::error!("An error occurred on output stream: {}", err),
                        None,
                    )
                    .context("Failed to open output stream")?
            }
        };
        stream.play().context("Failed to start output stream")?;
        tracing::debug!("Output stream config: {:?}", &output_config);

        Ok(PlaybackContext {
            _stream: stream,
            producer,
            resampler,
            played,
        })
    }
}

impl Drop for SpeakerPlayback {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn output_callback(
    channels: usize,
    consumer: Arc<std::sync::Mutex<ringbuf::HeapCons<f32>>>,
    played: Arc<AtomicU64>,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let Ok(mut consumer) = consumer.lock() else {
            data.fill(0.0);
            return;
        };
        let mut popped = 0;
        // Mono source, copied to every output channel.
        for frame in data.chunks_mut(channels.max(1)) {
            let sample = match consumer.try_pop() {
                Some(sample) => {
                    popped += 1;
                    sample
                }
                None => 0.0,
            };
            frame.fill(sample);
        }
        played.fetch_add(popped, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_retire_in_order() {
        let mut queue = SegmentQueue::default();
        let a = queue.schedule(100);
        let b = queue.schedule(50);
        let c = queue.schedule(10);

        assert_eq!(queue.active(0), vec![a, b, c]);
        assert_eq!(queue.active(100), vec![b, c]);
        assert_eq!(queue.active(149), vec![b, c]);
        assert_eq!(queue.active(160), Vec::<PlaybackHandle>::new());
    }

    #[test]
    fn test_clear_discards_everything_and_stays_usable() {
        let mut queue = SegmentQueue::default();
        for _ in 0..5 {
            queue.schedule(1024);
        }
        assert_eq!(queue.clear(), 5);
        assert!(queue.active(0).is_empty());

        let next = queue.schedule(10);
        assert_eq!(queue.active(0), vec![next]);
        assert!(queue.active(10).is_empty());
    }

    #[test]
    fn test_empty_segment_is_rejected_without_a_device() {
        let mut playback = SpeakerPlayback::new(None);
        assert!(playback.enqueue(&[]).is_err());
        assert!(playback.enqueue(&[0x01]).is_err());
        playback.clear();
        playback.cleanup();
        assert!(playback.active().is_empty());
    }
}
