//! Frame classification
//!
//! A classifier looks at the first bytes of a pending frame and decides its
//! type tag and total length. It keeps no state between calls; the engine
//! owns reconstruction.

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{ContractError, SourceChannel, TypeTag};

/// Result of classifying a frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Frame type identifier
    pub type_tag: TypeTag,
    /// Total frame length, header included
    pub frame_length: usize,
}

/// Maps a frame header to its type and expected length
pub trait FrameClassifier: Send + Sync {
    /// Bytes required before `classify` can decide
    fn header_length(&self) -> usize;

    /// Classify a pending frame from its first `header_length()` bytes
    ///
    /// # Errors
    /// `MalformedFrame` when the header cannot start a valid frame.
    fn classify(
        &self,
        channel: &SourceChannel,
        header: &[u8],
    ) -> Result<Classification, ContractError>;

    /// Check a complete frame image before dispatch
    fn validate(&self, channel: &SourceChannel, image: &[u8]) -> Result<(), ContractError> {
        let _ = (channel, image);
        Ok(())
    }
}

/// First byte of every sync-word envelope
pub const SYNC_BYTE: u8 = 0xAA;

/// Protocol version written by [`SyncWordClassifier::encode`]
pub const ENVELOPE_VERSION: u8 = 1;

/// SYNC(2) + FRAMESIZE(2) + IDCODE(2)
pub const ENVELOPE_HEADER_LENGTH: usize = 6;

/// CHK(2)
pub const CHECKSUM_LENGTH: usize = 2;

/// Smallest well-formed envelope (empty body)
pub const MIN_FRAME_LENGTH: usize = ENVELOPE_HEADER_LENGTH + CHECKSUM_LENGTH;

/// Largest type tag representable in the sync word
pub const MAX_TYPE_TAG: u16 = 0x7;

/// Classifier for synchrophasor-style sync-word envelopes
///
/// Layout (big endian):
///
/// | bytes | field |
/// |-------|-------|
/// | 0     | `0xAA` |
/// | 1     | type (bits 6-4) and version (bits 3-0) |
/// | 2..4  | total frame size |
/// | 4..6  | device id code |
/// | 6..n-2 | body |
/// | n-2..n | CRC-CCITT of bytes 0..n-2 |
#[derive(Debug, Clone)]
pub struct SyncWordClassifier {
    verify_checksum: bool,
}

impl SyncWordClassifier {
    /// Classifier verifying the CRC trailer
    pub fn new() -> Self {
        Self {
            verify_checksum: true,
        }
    }

    /// Classifier that skips CRC verification
    pub fn without_checksum() -> Self {
        Self {
            verify_checksum: false,
        }
    }

    pub fn verifies_checksum(&self) -> bool {
        self.verify_checksum
    }

    /// Build a complete envelope around `body`
    ///
    /// # Errors
    /// `Other` when the tag does not fit the sync word or the frame exceeds
    /// the 16-bit size field.
    pub fn encode(type_tag: TypeTag, id_code: u16, body: &[u8]) -> Result<Bytes, ContractError> {
        if type_tag.0 > MAX_TYPE_TAG {
            return Err(ContractError::Other(format!(
                "type tag {type_tag} does not fit a sync-word envelope (max {MAX_TYPE_TAG})"
            )));
        }

        let frame_length = MIN_FRAME_LENGTH + body.len();
        let size = u16::try_from(frame_length).map_err(|_| {
            ContractError::Other(format!("frame of {frame_length} bytes exceeds 65535"))
        })?;

        let mut frame = BytesMut::with_capacity(frame_length);
        frame.put_u8(SYNC_BYTE);
        frame.put_u8(((type_tag.0 as u8) << 4) | ENVELOPE_VERSION);
        frame.put_u16(size);
        frame.put_u16(id_code);
        frame.put_slice(body);
        let crc = calculate_crc(&frame);
        frame.put_u16(crc);

        Ok(frame.freeze())
    }

    /// Device id code of a complete envelope
    pub fn id_code(image: &[u8]) -> Option<u16> {
        (image.len() >= ENVELOPE_HEADER_LENGTH).then(|| u16::from_be_bytes([image[4], image[5]]))
    }

    /// Body of a complete envelope (header and trailer stripped)
    pub fn body(image: &[u8]) -> &[u8] {
        if image.len() < MIN_FRAME_LENGTH {
            return &[];
        }
        &image[ENVELOPE_HEADER_LENGTH..image.len() - CHECKSUM_LENGTH]
    }
}

impl Default for SyncWordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClassifier for SyncWordClassifier {
    fn header_length(&self) -> usize {
        4
    }

    fn classify(
        &self,
        channel: &SourceChannel,
        header: &[u8],
    ) -> Result<Classification, ContractError> {
        if header.len() < self.header_length() {
            return Err(ContractError::malformed_frame(
                channel.as_str(),
                format!("header too short: {} bytes", header.len()),
            ));
        }

        if header[0] != SYNC_BYTE {
            return Err(ContractError::malformed_frame(
                channel.as_str(),
                format!("invalid sync byte 0x{:02X}, expected 0x{SYNC_BYTE:02X}", header[0]),
            ));
        }

        let type_tag = TypeTag(((header[1] >> 4) & 0x7) as u16);
        let frame_length = u16::from_be_bytes([header[2], header[3]]) as usize;

        if frame_length < MIN_FRAME_LENGTH {
            return Err(ContractError::malformed_frame(
                channel.as_str(),
                format!("frame size {frame_length} is below the minimum of {MIN_FRAME_LENGTH}"),
            ));
        }

        Ok(Classification {
            type_tag,
            frame_length,
        })
    }

    fn validate(&self, channel: &SourceChannel, image: &[u8]) -> Result<(), ContractError> {
        if !self.verify_checksum {
            return Ok(());
        }

        let split = image.len().saturating_sub(CHECKSUM_LENGTH);
        let (content, trailer) = image.split_at(split);
        if trailer.len() != CHECKSUM_LENGTH {
            return Err(ContractError::malformed_frame(
                channel.as_str(),
                "frame too short for checksum",
            ));
        }

        let expected = u16::from_be_bytes([trailer[0], trailer[1]]);
        let actual = calculate_crc(content);
        if expected != actual {
            return Err(ContractError::malformed_frame(
                channel.as_str(),
                format!("checksum mismatch: frame carries 0x{expected:04X}, computed 0x{actual:04X}"),
            ));
        }

        Ok(())
    }
}

/// CRC-CCITT (polynomial 0x1021, initial value 0xFFFF)
pub fn calculate_crc(buffer: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in buffer {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> SourceChannel {
        SourceChannel::new("tcp:4712")
    }

    #[test]
    fn test_crc_known_value() {
        // CRC-16/CCITT-FALSE check value
        assert_eq!(calculate_crc(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_encode_then_classify() {
        let frame = SyncWordClassifier::encode(TypeTag(3), 17, &[1, 2, 3, 4]).unwrap();
        let classifier = SyncWordClassifier::new();

        let c = classifier.classify(&channel(), &frame[..4]).unwrap();
        assert_eq!(c.type_tag, TypeTag(3));
        assert_eq!(c.frame_length, frame.len());
        assert!(classifier.validate(&channel(), &frame).is_ok());

        assert_eq!(SyncWordClassifier::id_code(&frame), Some(17));
        assert_eq!(SyncWordClassifier::body(&frame), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_rejects_bad_sync_byte() {
        let err = SyncWordClassifier::new()
            .classify(&channel(), &[0x55, 0x01, 0x00, 0x10])
            .unwrap_err();
        assert!(matches!(err, ContractError::MalformedFrame { .. }));
        assert!(err.to_string().contains("0x55"));
    }

    #[test]
    fn test_rejects_undersized_frame() {
        assert!(SyncWordClassifier::new()
            .classify(&channel(), &[SYNC_BYTE, 0x01, 0x00, 0x04])
            .is_err());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut frame = SyncWordClassifier::encode(TypeTag(0), 1, &[9, 9]).unwrap().to_vec();
        frame[6] ^= 0xFF;

        assert!(SyncWordClassifier::new().validate(&channel(), &frame).is_err());
        assert!(SyncWordClassifier::without_checksum()
            .validate(&channel(), &frame)
            .is_ok());
    }

    #[test]
    fn test_encode_rejects_wide_tag() {
        assert!(SyncWordClassifier::encode(TypeTag(8), 1, &[]).is_err());
    }
}
