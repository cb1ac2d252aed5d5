#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    frames_sent: u64,
    bytes_sent: u64,
    frames_dropped: u64,
    binary_received: u64,
    text_received: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn record_dropped(&mut self) {
        self.frames_dropped += 1;
    }

    pub(crate) fn record_binary(&mut self) {
        self.binary_received += 1;
    }

    pub(crate) fn record_text(&mut self) {
        self.text_received += 1;
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Frames discarded because the outbound queue was full.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    pub fn binary_received(&self) -> u64 {
        self.binary_received
    }

    pub fn text_received(&self) -> u64 {
        self.text_received
    }
}
