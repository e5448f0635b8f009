//! Error types for patrol-client.

use thiserror::Error;

/// Main error type for all SDK operations.
///
/// Blocking operations return this directly; the fire-and-forget
/// `start_nav_task` path reports failures through its callback instead
/// (see [`crate::types::ErrorCode`]).
#[derive(Debug, Error)]
pub enum SdkError {
    /// I/O error on the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML encode/decode error in the message codec.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// No connection is established, or it was lost mid-request.
    #[error("not connected")]
    NotConnected,

    /// The server did not answer within the configured request timeout.
    #[error("request timed out")]
    Timeout,

    /// A response arrived but could not be interpreted for this request.
    #[error("invalid response")]
    InvalidResponse,

    /// A caller-supplied argument was rejected before anything was sent.
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),

    /// Protocol violation (oversized body, sequence collision, bad frame).
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using SdkError.
pub type Result<T> = std::result::Result<T, SdkError>;
