//! Per-channel frame reconstruction
//!
//! Each source channel carries its own partial frame through
//! `AwaitingHeader -> Accumulating -> complete`. Completion is driven only by
//! byte availability; there are no timeouts.

use bytes::{Bytes, BytesMut};
use contracts::{ContractError, SourceChannel, TypeTag};

use crate::classifier::{Classification, FrameClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingHeader,
    Accumulating(Classification),
}

/// A frame recognized inside [`Reassembly::image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CompletedFrame {
    pub type_tag: TypeTag,
    pub offset: usize,
    pub length: usize,
}

/// Outcome of feeding one fragment
#[derive(Debug, Default)]
pub(crate) struct Reassembly {
    /// Bytes of every completed frame, back to back
    pub image: Bytes,
    pub frames: Vec<CompletedFrame>,
    /// Set when the channel was reset
    pub malformed: Option<ContractError>,
}

/// Reconstruction state of one channel
#[derive(Debug)]
pub(crate) struct ChannelState {
    buffer: BytesMut,
    phase: Phase,
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            phase: Phase::AwaitingHeader,
        }
    }

    /// Bytes held for an incomplete frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn phase_name(&self) -> &'static str {
        match self.phase {
            Phase::AwaitingHeader => "awaiting header",
            Phase::Accumulating(_) => "accumulating",
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.phase = Phase::AwaitingHeader;
    }

    /// Append a fragment and cut out every frame it completes
    ///
    /// A malformed header or a failed validation resets this channel; frames
    /// completed earlier in the same fragment are still returned.
    pub fn feed(
        &mut self,
        channel: &SourceChannel,
        data: &[u8],
        classifier: &dyn FrameClassifier,
        max_frame_length: usize,
    ) -> Reassembly {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        let mut cursor = 0;
        let mut malformed = None;

        loop {
            let pending = &self.buffer[cursor..];

            match self.phase {
                Phase::AwaitingHeader => {
                    if pending.len() < classifier.header_length() {
                        break;
                    }

                    match classifier.classify(channel, &pending[..classifier.header_length()]) {
                        Ok(c) if c.frame_length > max_frame_length => {
                            malformed = Some(ContractError::malformed_frame(
                                channel.as_str(),
                                format!(
                                    "frame size {} exceeds the maximum of {max_frame_length}",
                                    c.frame_length
                                ),
                            ));
                            break;
                        }
                        Ok(c) if c.frame_length < classifier.header_length() => {
                            malformed = Some(ContractError::malformed_frame(
                                channel.as_str(),
                                format!("frame size {} is shorter than its header", c.frame_length),
                            ));
                            break;
                        }
                        Ok(c) => self.phase = Phase::Accumulating(c),
                        Err(e) => {
                            malformed = Some(e);
                            break;
                        }
                    }
                }
                Phase::Accumulating(c) => {
                    if pending.len() < c.frame_length {
                        break;
                    }

                    if let Err(e) = classifier.validate(channel, &pending[..c.frame_length]) {
                        malformed = Some(e);
                        break;
                    }

                    frames.push(CompletedFrame {
                        type_tag: c.type_tag,
                        offset: cursor,
                        length: c.frame_length,
                    });
                    cursor += c.frame_length;
                    self.phase = Phase::AwaitingHeader;
                }
            }
        }

        let image = self.buffer.split_to(cursor).freeze();
        if malformed.is_some() {
            self.reset();
        }

        Reassembly {
            image,
            frames,
            malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SyncWordClassifier;

    fn frame(tag: u16, body: &[u8]) -> Bytes {
        SyncWordClassifier::encode(TypeTag(tag), 1, body).unwrap()
    }

    #[test]
    fn test_frame_split_across_fragments() {
        let channel = SourceChannel::new("a");
        let classifier = SyncWordClassifier::new();
        let mut state = ChannelState::new();
        let bytes = frame(0, &[1, 2, 3, 4, 5]);

        let first = state.feed(&channel, &bytes[..3], &classifier, 1024);
        assert!(first.frames.is_empty());
        assert_eq!(state.phase_name(), "awaiting header");

        let second = state.feed(&channel, &bytes[3..7], &classifier, 1024);
        assert!(second.frames.is_empty());
        assert_eq!(state.phase_name(), "accumulating");

        let third = state.feed(&channel, &bytes[7..], &classifier, 1024);
        assert_eq!(third.frames.len(), 1);
        assert_eq!(&third.image[..], &bytes[..]);
        assert_eq!(state.pending(), 0);
    }

    #[test]
    fn test_several_frames_in_one_fragment() {
        let channel = SourceChannel::new("a");
        let classifier = SyncWordClassifier::new();
        let mut state = ChannelState::new();

        let a = frame(0, &[1]);
        let b = frame(2, &[2, 2]);
        let mut joined = a.to_vec();
        joined.extend_from_slice(&b);
        joined.extend_from_slice(&a[..2]);

        let out = state.feed(&channel, &joined, &classifier, 1024);
        assert_eq!(out.frames.len(), 2);
        assert_eq!(out.frames[1].offset, a.len());
        assert_eq!(out.frames[1].type_tag, TypeTag(2));
        assert_eq!(state.pending(), 2);
    }

    #[test]
    fn test_malformed_header_resets_channel_but_keeps_completed_frames() {
        let channel = SourceChannel::new("a");
        let classifier = SyncWordClassifier::new();
        let mut state = ChannelState::new();

        let mut bytes = frame(0, &[1]).to_vec();
        bytes.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44]);

        let out = state.feed(&channel, &bytes, &classifier, 1024);
        assert_eq!(out.frames.len(), 1);
        assert!(out.malformed.is_some());
        assert_eq!(state.pending(), 0);
        assert_eq!(state.phase_name(), "awaiting header");
    }

    #[test]
    fn test_oversized_frame_is_malformed() {
        let channel = SourceChannel::new("a");
        let classifier = SyncWordClassifier::new();
        let mut state = ChannelState::new();
        let bytes = frame(0, &[0; 64]);

        let out = state.feed(&channel, &bytes, &classifier, 32);
        assert!(out.frames.is_empty());
        assert!(matches!(out.malformed, Some(ContractError::MalformedFrame { .. })));
    }
}
