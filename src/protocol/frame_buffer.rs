//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` and a state machine for fragmented frames:
//! - `AwaitingHeader`: need at least 16 bytes
//! - `AwaitingBody`: header parsed, need `body_len` more bytes
//!
//! The header stage validates the sync word; an invalid sync word is
//! returned as an error and the caller must tear the connection down,
//! since there is no way to resynchronize the stream.

use bytes::BytesMut;

use super::frame::Frame;
use super::wire_format::{FrameHeader, HEADER_SIZE};
use crate::error::Result;

#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header (16 bytes).
    AwaitingHeader,
    /// Header parsed, waiting for the body bytes.
    AwaitingBody { header: FrameHeader },
}

/// Buffer for accumulating inbound bytes and extracting complete frames.
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
}

impl FrameBuffer {
    /// Create a new frame buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            state: State::AwaitingHeader,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid sync word; the stream is then
    /// unusable and the buffer state is undefined.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::AwaitingHeader => {
                let header = match FrameHeader::decode(&self.buffer)? {
                    Some(h) => h,
                    None => return Ok(None),
                };

                let _ = self.buffer.split_to(HEADER_SIZE);
                self.state = State::AwaitingBody { header };
                self.try_extract_one()
            }

            State::AwaitingBody { header } => {
                let body_len = header.body_len as usize;
                if self.buffer.len() < body_len {
                    return Ok(None);
                }

                let body = self.buffer.split_to(body_len).freeze();
                self.state = State::AwaitingHeader;
                Ok(Some(Frame::new(header, body)))
            }
        }
    }

    /// Number of buffered bytes not yet consumed by a complete frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
