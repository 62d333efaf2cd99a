//! Frame types shared between the frame parser and its consumers
//!
//! A `FrameEnvelope` borrows the parser's reconstruction buffer and only
//! lives for the duration of one dispatch. Handlers turn it into an owned
//! `ChannelFrame` whose category is resolved once, at completion.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::SourceChannel;

/// Protocol frame type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag(pub u16);

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for TypeTag {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Fundamental frame category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameCategory {
    /// Measurement data
    Data,
    /// Device configuration
    Configuration,
    /// Free-form header text
    Header,
    /// Device command
    Command,
    /// Concrete type without a known category
    Undetermined,
}

impl FrameCategory {
    /// Stable lowercase name (used in logs and metrics labels)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Configuration => "configuration",
            Self::Header => "header",
            Self::Command => "command",
            Self::Undetermined => "undetermined",
        }
    }
}

impl fmt::Display for FrameCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete, recognized frame still inside the parser's buffer
#[derive(Debug, Clone, Copy)]
pub struct FrameEnvelope<'a> {
    /// Type identifier resolved by the classifier
    pub type_tag: TypeTag,

    /// Channel the bytes arrived on
    pub source: &'a SourceChannel,

    /// Reconstruction buffer (not owned past the dispatch call)
    pub buffer: &'a [u8],

    /// Frame start within `buffer`
    pub offset: usize,

    /// Frame length in bytes
    pub length: usize,
}

impl<'a> FrameEnvelope<'a> {
    /// The frame bytes
    pub fn image(&self) -> &'a [u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }

    /// Defensive copy of the frame bytes
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.image())
    }
}

/// Parsed, owned frame delivered to consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFrame {
    /// Category resolved at completion
    pub category: FrameCategory,

    /// Type identifier
    pub type_tag: TypeTag,

    /// Originating channel
    pub source: SourceChannel,

    /// Device identifier, when the envelope carries one
    pub id_code: Option<u16>,

    /// Frame body (envelope header and trailer stripped)
    pub payload: Bytes,
}
