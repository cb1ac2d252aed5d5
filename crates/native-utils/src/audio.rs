use std::collections::VecDeque;

use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Feeds a resampler across calls. Input that does not fill a whole chunk is
/// carried over to the next `push`, so consecutive blocks come out
/// back to back with no padding between them.
pub struct ChunkedResampler {
    resampler: FastFixedIn<f32>,
    pending: VecDeque<f32>,
}

impl ChunkedResampler {
    pub fn new(resampler: FastFixedIn<f32>) -> Self {
        Self {
            resampler,
            pending: VecDeque::new(),
        }
    }

    /// Resamples every complete chunk available after appending `samples`.
    pub fn push(&mut self, samples: &[f32]) -> Vec<f32> {
        self.pending.extend(samples);
        let mut out = Vec::new();
        loop {
            let needed = self.resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            match self.resampler.process(&[chunk.as_slice()], None) {
                Ok(resampled) => {
                    if let Some(channel) = resampled.first() {
                        out.extend_from_slice(channel);
                    }
                }
                Err(e) => tracing::warn!("Failed to resample chunk: {}", e),
            }
        }
        out
    }

    /// Samples waiting for a full chunk.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drops carried-over input and the resampler's history.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.resampler.reset();
    }
}

/// Creates a new ring buffer on the heap for shared audio data.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Averages interleaved multi-channel samples down to mono.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels > 1 {
        data.chunks(channels)
            .map(|c| c.iter().sum::<f32>() / c.len() as f32)
            .collect()
    } else {
        data.to_vec()
    }
}

/// Converts normalized samples to PCM16.
///
/// Samples are clamped to [-1, 1] first. Negative values scale by 32768 and
/// non-negative values by 32767, so both ends of the range map exactly onto
/// `i16::MIN` and `i16::MAX`.
pub fn encode_f32(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| {
            let s = sample.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

/// Converts PCM16 back to normalized samples. Inverse of [`encode_f32`].
pub fn decode_i16(pcm16: &[i16]) -> Vec<f32> {
    pcm16
        .iter()
        .map(|&sample| {
            if sample < 0 {
                sample as f32 / 32768.0
            } else {
                sample as f32 / 32767.0
            }
        })
        .collect()
}

/// Interprets raw little-endian bytes as PCM16. A trailing odd byte is dropped.
pub fn pcm16_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    if bytes.len() % 2 != 0 {
        tracing::warn!("PCM16 payload has odd length {}, dropping last byte", bytes.len());
    }
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// A trait for converting audio sample types to a binary representation (Vec<u8>).
pub trait ToBinary {
    fn to_binary(&self) -> Vec<u8>;
}

impl ToBinary for [i16] {
    fn to_binary(&self) -> Vec<u8> {
        self.iter()
            .flat_map(|&sample| sample.to_le_bytes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 32767.0;

    #[test]
    fn test_round_trip_within_one_step() {
        let samples: Vec<f32> = (-1000..=1000).map(|i| i as f32 / 1000.0).collect();
        let decoded = decode_i16(&encode_f32(&samples));
        for (original, restored) in samples.iter().zip(decoded.iter()) {
            assert!(
                (original - restored).abs() <= STEP,
                "{original} came back as {restored}"
            );
        }
    }

    #[test]
    fn test_encode_saturates() {
        let encoded = encode_f32(&[-3.5, -1.0, 1.0, 7.25, f32::INFINITY, f32::NEG_INFINITY]);
        assert_eq!(
            encoded,
            vec![i16::MIN, i16::MIN, i16::MAX, i16::MAX, i16::MAX, i16::MIN]
        );
    }

    #[test]
    fn test_decode_extremes() {
        assert_eq!(decode_i16(&[i16::MIN, 0, i16::MAX]), vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_le_bytes() {
        let pcm: Vec<i16> = vec![1, -2, i16::MAX];
        let bytes = pcm.to_binary();
        assert_eq!(bytes, vec![0x01, 0x00, 0xfe, 0xff, 0xff, 0x7f]);
        assert_eq!(pcm16_from_le_bytes(&bytes), pcm);
        assert_eq!(pcm16_from_le_bytes(&[0x01, 0x00, 0x05]), vec![1]);
    }

    #[test]
    fn test_downmix_stereo() {
        assert_eq!(downmix(&[0.5, 0.25, -1.0, 1.0], 2), vec![0.375, 0.0]);
        assert_eq!(downmix(&[0.5, 0.25], 1), vec![0.5, 0.25]);
    }

    #[test]
    fn test_consecutive_segments_resample_without_gaps() {
        let chunk = 100;
        let mut resampler = ChunkedResampler::new(create_resampler(16000.0, 48000.0, chunk).unwrap());

        // Ten 20 ms segments, as a TTS stream delivers them.
        let mut out = 0;
        for _ in 0..10 {
            out += resampler.push(&vec![0.25; 320]).len();
        }
        let expected = 3200 * 3;
        assert!(
            out.abs_diff(expected) <= chunk * 3,
            "{out} samples for 3200 input, expected about {expected}"
        );
        assert!(resampler.pending() < chunk);
    }

    #[test]
    fn test_reset_drops_carry_over() {
        let mut resampler = ChunkedResampler::new(create_resampler(16000.0, 48000.0, 100).unwrap());
        assert!(resampler.push(&[0.1; 60]).is_empty());
        assert_eq!(resampler.pending(), 60);
        resampler.reset();
        assert_eq!(resampler.pending(), 0);
        assert!(resampler.push(&[0.1; 60]).is_empty());
    }
}
