//! Wire format encoding and decoding.
//!
//! Implements the 16-byte frame header:
//! ```text
//! ┌───────────────┬──────────┬──────────┬──────────┐
//! │ Sync          │ Length   │ Sequence │ Reserved │
//! │ 4 bytes       │ 2 bytes  │ 2 bytes  │ 8 bytes  │
//! │ EB 90 EB 90   │ u16 LE   │ u16 LE   │ zeroed   │
//! └───────────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Little Endian regardless of host order.
//! The sync word is validated on every inbound header; a mismatch is a
//! fatal stream error and the connection must be torn down.

use crate::error::{Result, SdkError};

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Sync word marking the start of every frame.
pub const SYNC_WORD: [u8; 4] = [0xEB, 0x90, 0xEB, 0x90];

/// Maximum body size a frame can carry (the length field is a u16).
pub const MAX_BODY_SIZE: usize = u16::MAX as usize;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Body length in bytes, taken verbatim from the wire.
    pub body_len: u16,
    /// Client-chosen correlation id, echoed by the server.
    pub sequence: u16,
}

impl FrameHeader {
    /// Create a new header.
    pub fn new(body_len: u16, sequence: u16) -> Self {
        Self { body_len, sequence }
    }

    /// Encode the header to bytes (sync word, LE integers, zeroed reserved).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&SYNC_WORD);
        buf[4..6].copy_from_slice(&self.body_len.to_le_bytes());
        buf[6..8].copy_from_slice(&self.sequence.to_le_bytes());
        // bytes 8..16 stay zero (reserved)
        buf
    }

    /// Decode a header from bytes, validating the sync word.
    ///
    /// Returns `None` if the buffer is too short. The reserved bytes are
    /// ignored on receive.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Protocol`] if the sync word does not match.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        if buf[0..4] != SYNC_WORD {
            return Err(SdkError::Protocol(format!(
                "invalid sync word: {:02X} {:02X} {:02X} {:02X}",
                buf[0], buf[1], buf[2], buf[3]
            )));
        }
        Ok(Some(Self {
            body_len: u16::from_le_bytes([buf[4], buf[5]]),
            sequence: u16::from_le_bytes([buf[6], buf[7]]),
        }))
    }
}

/// Build a complete frame as a single byte vector.
///
/// # Errors
///
/// Returns [`SdkError::Protocol`] if the body exceeds [`MAX_BODY_SIZE`].
pub fn build_frame(body: &[u8], sequence: u16) -> Result<Vec<u8>> {
    if body.len() > MAX_BODY_SIZE {
        return Err(SdkError::Protocol(format!(
            "body size {} exceeds maximum {}",
            body.len(),
            MAX_BODY_SIZE
        )));
    }

    let header = FrameHeader::new(body.len() as u16, sequence);
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(body);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_encode_decode_roundtrip() {
        let original = FrameHeader::new(512, 42);
        let encoded = original.encode();
        let decoded = FrameHeader::decode(&encoded).unwrap().unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn header_little_endian_byte_order() {
        let header = FrameHeader::new(0x0102, 0x0304);
        let bytes = header.encode();

        assert_eq!(&bytes[0..4], &SYNC_WORD);

        // Body length: 0x0102 in LE
        assert_eq!(bytes[4], 0x02);
        assert_eq!(bytes[5], 0x01);

        // Sequence: 0x0304 in LE
        assert_eq!(bytes[6], 0x04);
        assert_eq!(bytes[7], 0x03);

        // Reserved zeroed
        assert!(bytes[8..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn header_size_is_exactly_16() {
        assert_eq!(HEADER_SIZE, 16);
        let header = FrameHeader::new(0, 0);
        assert_eq!(header.encode().len(), 16);
    }

    #[test]
    fn decode_too_short_buffer() {
        let buf = [0xEBu8; 15];
        assert!(FrameHeader::decode(&buf).unwrap().is_none());
    }

    #[test]
    fn decode_rejects_bad_sync() {
        let mut bytes = FrameHeader::new(4, 1).encode();
        bytes[0] = 0x00;
        let err = FrameHeader::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("invalid sync word"));
    }

    #[test]
    fn decode_ignores_reserved_bytes() {
        let mut bytes = FrameHeader::new(7, 9).encode();
        bytes[8..16].copy_from_slice(&[0xFF; 8]);
        let decoded = FrameHeader::decode(&bytes).unwrap().unwrap();
        assert_eq!(decoded.body_len, 7);
        assert_eq!(decoded.sequence, 9);
    }

    #[test]
    fn build_frame_prepends_header() {
        let frame = build_frame(b"hello", 3).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + 5);

        let header = FrameHeader::decode(&frame).unwrap().unwrap();
        assert_eq!(header.body_len, 5);
        assert_eq!(header.sequence, 3);
        assert_eq!(&frame[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn build_frame_empty_body() {
        let frame = build_frame(b"", 1).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE);
    }

    #[test]
    fn build_frame_max_body() {
        let body = vec![0xAB; MAX_BODY_SIZE];
        let frame = build_frame(&body, 1).unwrap();
        let header = FrameHeader::decode(&frame).unwrap().unwrap();
        assert_eq!(header.body_len as usize, MAX_BODY_SIZE);
    }

    #[test]
    fn build_frame_rejects_oversized_body() {
        let body = vec![0u8; MAX_BODY_SIZE + 1];
        let err = build_frame(&body, 1).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn sequence_wraparound_values_encode() {
        for seq in [0u16, 1, u16::MAX - 1, u16::MAX] {
            let header = FrameHeader::new(0, seq);
            let decoded = FrameHeader::decode(&header.encode()).unwrap().unwrap();
            assert_eq!(decoded.sequence, seq);
        }
    }
}
