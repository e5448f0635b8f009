//! # patrol-client
//!
//! Client SDK for the PatrolDevice quadruped-robot control protocol.
//!
//! Speaks a framed request/response protocol over a single persistent TCP
//! connection: each message is a 16-byte binary header (sync word, body
//! length, sequence number) followed by an XML body. The SDK is always
//! the client; the robot control server is the peer.
//!
//! ## Architecture
//!
//! - **Framing** ([`protocol`]): header codec and partial-read reassembly.
//! - **Message codec** ([`codec`]): `<PatrolDevice>` XML bodies ↔ typed
//!   requests and responses.
//! - **Transport**: one reader task and one writer task per connection;
//!   writes are serialized through a single queue.
//! - **Correlation**: a pending table keyed by the 16-bit sequence number
//!   lets any number of callers issue blocking requests over the one
//!   connection, while navigation-task results (which may arrive minutes
//!   later) are delivered through per-request callbacks.
//!
//! ## Example
//!
//! ```ignore
//! use patrol_client::{PatrolClient, SdkOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PatrolClient::new(SdkOptions::default());
//!     client.connect("192.168.1.10", 30000).await?;
//!
//!     let status = client.request_runtime_status().await?;
//!     println!("battery: {}%  position: ({}, {})",
//!         status.electricity, status.pos_x, status.pos_y);
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod protocol;
pub mod types;

mod callback;
mod client;
mod correlator;
mod transport;

pub use client::PatrolClient;
pub use error::{Result, SdkError};
pub use types::{
    ErrorCode, NavigationPoint, NavigationResult, NavigationResultCallback, NavigationStatus,
    RealTimeStatus, SdkOptions, TaskStatusResult,
};
