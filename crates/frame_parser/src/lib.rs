//! # Frame Parser
//!
//! Multi-source frame reconstruction and dispatch.
//!
//! Responsibilities:
//! - Reassemble complete frames from interleaved, fragmented byte streams
//! - Classify frames by type tag and route them by category
//! - Report unknown types, duplicate registrations and malformed frames
//! - Echo raw frame buffers through an asynchronous queue
//!
//! ## Usage Example
//!
//! ```ignore
//! use frame_parser::{EnvelopeHandler, FrameDispatchEngine, ParserEvent};
//!
//! let engine = FrameDispatchEngine::builder()
//!     .handlers(EnvelopeHandler::standard_set())
//!     .on_event(|event| {
//!         if let ParserEvent::DataFrame(frame) = event {
//!             // Hand to source components
//!         }
//!     })
//!     .build();
//!
//! engine.parse(&"tcp:4712".into(), &bytes);
//! ```

mod channel;
mod classifier;
mod config;
mod engine;
mod error;
mod events;
mod queue;
mod registry;

// Re-exports
pub use classifier::{
    calculate_crc, Classification, FrameClassifier, SyncWordClassifier, CHECKSUM_LENGTH,
    ENVELOPE_HEADER_LENGTH, MIN_FRAME_LENGTH, SYNC_BYTE,
};
pub use config::{MetricsSnapshot, ParserConfig, ParserMetrics, DEFAULT_MAX_FRAME_LENGTH};
pub use engine::{FrameDispatchEngine, FrameDispatchEngineBuilder};
pub use error::{ParserError, Result};
pub use events::{FrameBuffer, ParserEvent};
pub use queue::{NotificationQueue, QueueMetrics};
pub use registry::{EnvelopeHandler, FrameHandler, TypeHandlerRegistry};
