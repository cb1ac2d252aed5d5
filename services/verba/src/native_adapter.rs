use anyhow::Result;
use verba_core::{CapturePipeline, FrameCallback, PlaybackPipeline};
use verba_native_utils::{MicrophoneCapture, SpeakerPlayback};

/// Microphone capture through cpal, behind the session's `CapturePipeline`.
pub struct CaptureAdapter {
    capture: MicrophoneCapture,
}

impl CaptureAdapter {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            capture: MicrophoneCapture::new(device_name),
        }
    }
}

impl CapturePipeline for CaptureAdapter {
    fn initialize(&mut self) -> Result<()> {
        self.capture.initialize()
    }

    fn is_initialized(&self) -> bool {
        self.capture.is_initialized()
    }

    fn start_capture(&mut self, on_frame: FrameCallback) -> Result<()> {
        self.capture.start_capture(on_frame)
    }

    fn is_capturing(&self) -> bool {
        self.capture.is_capturing()
    }

    fn stop_capture(&mut self) {
        self.capture.stop_capture();
    }

    fn cleanup(&mut self) {
        self.capture.cleanup();
    }
}

/// Speaker playback through cpal, behind the session's `PlaybackPipeline`.
pub struct PlaybackAdapter {
    playback: SpeakerPlayback,
}

impl PlaybackAdapter {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            playback: SpeakerPlayback::new(device_name),
        }
    }
}

impl PlaybackPipeline for PlaybackAdapter {
    fn enqueue(&mut self, segment: &[u8]) -> Result<()> {
        self.playback.enqueue(segment).map(|_| ())
    }

    fn clear(&mut self) {
        self.playback.clear();
    }

    fn pending(&self) -> usize {
        self.playback.active().len()
    }

    fn cleanup(&mut self) {
        self.playback.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // None of these touch a device.
    #[test]
    fn test_idle_adapters() {
        let mut capture = CaptureAdapter::new(None);
        assert!(!capture.is_initialized());
        assert!(!capture.is_capturing());
        assert!(capture.start_capture(Box::new(|_| {})).is_err());
        capture.stop_capture();
        capture.cleanup();

        let mut playback = PlaybackAdapter::new(None);
        assert!(playback.enqueue(&[]).is_err());
        assert_eq!(playback.pending(), 0);
        playback.clear();
        playback.cleanup();
    }
}
