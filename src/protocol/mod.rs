//! Binary framing layer.
//!
//! Every message travels as a 16-byte header followed by an XML body of
//! `body_len` bytes. This module owns the header codec ([`wire_format`]),
//! the frame value type ([`frame`]) and the partial-read reassembly buffer
//! ([`frame_buffer`]). Body contents are opaque here; see [`crate::codec`].

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use wire_format::{build_frame, FrameHeader, HEADER_SIZE, MAX_BODY_SIZE, SYNC_WORD};
