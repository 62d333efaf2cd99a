//! Pipeline orchestration module.

mod feed;
mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::{GroupStats, PipelineStats, StopReason};
