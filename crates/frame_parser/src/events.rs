//! Parser notifications

use std::sync::Arc;

use bytes::Bytes;
use contracts::{ChannelFrame, ContractError, FrameCategory, SourceChannel};

/// Notification raised by the frame dispatch engine
#[derive(Debug, Clone)]
pub enum ParserEvent {
    /// A complete frame was recognized (raised for every frame, known or not)
    FrameReceived {
        source: SourceChannel,
        category: FrameCategory,
        length: usize,
    },
    ConfigurationFrame(ChannelFrame),
    DataFrame(ChannelFrame),
    HeaderFrame(ChannelFrame),
    CommandFrame(ChannelFrame),
    /// Frame of a concrete type without a known category
    UndeterminedFrame(ChannelFrame),
    /// Diagnostic or failure; never fatal
    ProcessError(Arc<ContractError>),
}

impl ParserEvent {
    /// Route a parsed frame by its category
    pub fn from_frame(frame: ChannelFrame) -> Self {
        match frame.category {
            FrameCategory::Configuration => Self::ConfigurationFrame(frame),
            FrameCategory::Data => Self::DataFrame(frame),
            FrameCategory::Header => Self::HeaderFrame(frame),
            FrameCategory::Command => Self::CommandFrame(frame),
            FrameCategory::Undetermined => Self::UndeterminedFrame(frame),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FrameReceived { .. } => "FrameReceived",
            Self::ConfigurationFrame(_) => "ConfigurationFrame",
            Self::DataFrame(_) => "DataFrame",
            Self::HeaderFrame(_) => "HeaderFrame",
            Self::CommandFrame(_) => "CommandFrame",
            Self::UndeterminedFrame(_) => "UndeterminedFrame",
            Self::ProcessError(_) => "ProcessError",
        }
    }

    /// Parsed frame carried by this event, if any
    pub fn frame(&self) -> Option<&ChannelFrame> {
        match self {
            Self::ConfigurationFrame(f)
            | Self::DataFrame(f)
            | Self::HeaderFrame(f)
            | Self::CommandFrame(f)
            | Self::UndeterminedFrame(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ContractError> {
        match self {
            Self::ProcessError(e) => Some(e),
            _ => None,
        }
    }
}

/// Copy of a complete frame image, delivered through the echo queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub source: SourceChannel,
    pub bytes: Bytes,
}
