//! Parser configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Default upper bound on a single frame
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 65_535;

/// Frame parser configuration
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Frames announcing a larger size are malformed
    pub max_frame_length: usize,

    /// Name of the frame buffer echo queue (logs and errors)
    pub echo_queue_name: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            echo_queue_name: "frame-buffer-echo".to_string(),
        }
    }
}

/// Parser metrics
#[derive(Debug, Default)]
pub struct ParserMetrics {
    /// Total bytes handed to `parse`
    pub bytes_received: AtomicU64,

    /// Complete frames recognized
    pub frames_received: AtomicU64,

    /// Frames successfully turned into `ChannelFrame`s
    pub frames_parsed: AtomicU64,

    /// Frames with no registered handler
    pub unknown_types: AtomicU64,

    /// Malformed frames (channel reset)
    pub malformed_frames: AtomicU64,

    /// Frame buffers queued for echo
    pub buffers_queued: AtomicU64,
}

impl ParserMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_bytes(&self, len: usize) {
        self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parsed(&self) {
        self.frames_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_type(&self) {
        self.unknown_types.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buffer_queued(&self) {
        self.buffers_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_parsed: self.frames_parsed.load(Ordering::Relaxed),
            unknown_types: self.unknown_types.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            buffers_queued: self.buffers_queued.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub frames_received: u64,
    pub frames_parsed: u64,
    pub unknown_types: u64,
    pub malformed_frames: u64,
    pub buffers_queued: u64,
}
