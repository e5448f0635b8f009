//! Frame value type.
//!
//! A complete frame as extracted from the stream: the decoded header plus
//! the body bytes. Uses `bytes::Bytes` so the body can be handed to the
//! codec without copying.

use bytes::Bytes;

use super::wire_format::FrameHeader;

/// A complete inbound frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: FrameHeader,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from header and body.
    pub fn new(header: FrameHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    /// The sequence number echoed by the server.
    #[inline]
    pub fn sequence(&self) -> u16 {
        self.header.sequence
    }

    /// Body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
