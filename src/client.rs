//! Client facade.
//!
//! [`PatrolClient`] owns the correlator and the live connection and
//! exposes the four operations of the control protocol. Wire-level raw
//! integers become user types here; no codec or I/O failure crosses the
//! boundary as anything but the operation's error taxonomy.
//!
//! # Example
//!
//! ```ignore
//! use patrol_client::{NavigationPoint, PatrolClient, SdkOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PatrolClient::new(SdkOptions::default());
//!     client.connect("192.168.1.10", 30000).await?;
//!
//!     let status = client.request_runtime_status().await?;
//!     println!("battery: {}%", status.electricity);
//!
//!     let point = NavigationPoint { map_id: 1, value: 3, pos_x: 2.5, ..Default::default() };
//!     client
//!         .start_nav_task(vec![point], |result| {
//!             println!("navigation finished: {:?}", result.error_code);
//!         })
//!         .await;
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use crate::callback::invoke_nav_callback;
use crate::codec::{Request, Response};
use crate::correlator::Correlator;
use crate::error::{Result, SdkError};
use crate::protocol::build_frame;
use crate::transport::Transport;
use crate::types::{
    wire_timestamp, ErrorCode, NavigationPoint, NavigationResult, NavigationStatus, RealTimeStatus,
    SdkOptions, TaskStatusResult,
};

/// Client for the PatrolDevice robot control server.
///
/// One client speaks over one TCP connection. Blocking operations may be
/// issued concurrently from any number of tasks; each suspends only on its
/// own request's wake primitive, bounded by
/// [`SdkOptions::request_timeout`].
pub struct PatrolClient {
    options: SdkOptions,
    correlator: Arc<Correlator>,
    /// The live connection, if any. Swapped under `control`.
    conn: std::sync::Mutex<Option<Arc<Transport>>>,
    /// Serializes connect/disconnect transitions.
    control: tokio::sync::Mutex<()>,
}

impl PatrolClient {
    /// Create a client with the given options. No connection is made yet.
    pub fn new(options: SdkOptions) -> Self {
        Self {
            options,
            correlator: Arc::new(Correlator::new()),
            conn: std::sync::Mutex::new(None),
            control: tokio::sync::Mutex::new(()),
        }
    }

    /// SDK version string.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Connect to the control server.
    ///
    /// Bounded by [`SdkOptions::connect_timeout`]. A no-op when already
    /// connected.
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        let _control = self.control.lock().await;

        if self.is_connected() {
            return Ok(());
        }

        let transport = Transport::connect(
            host,
            port,
            self.options.connect_timeout,
            Arc::clone(&self.correlator),
        )
        .await?;

        let previous = self
            .conn
            .lock()
            .expect("conn lock poisoned")
            .replace(Arc::new(transport));

        // Reap a dead transport left over from a lost connection.
        if let Some(previous) = previous {
            previous.shutdown().await;
        }

        Ok(())
    }

    /// Disconnect from the control server.
    ///
    /// Wakes every in-flight blocking call with a terminal outcome, drops
    /// pending navigation callbacks, waits for the reader to stop, and is
    /// idempotent.
    pub async fn disconnect(&self) {
        let _control = self.control.lock().await;

        let transport = self.conn.lock().expect("conn lock poisoned").take();
        if let Some(transport) = transport {
            transport.shutdown().await;
        }
    }

    /// Whether a live connection exists.
    pub fn is_connected(&self) -> bool {
        self.conn
            .lock()
            .expect("conn lock poisoned")
            .as_ref()
            .map(|t| t.is_connected())
            .unwrap_or(false)
    }

    /// Number of blocking requests currently awaiting a response.
    pub fn pending_request_count(&self) -> usize {
        self.correlator.pending_sync_count()
    }

    /// Fetch the robot's real-time telemetry.
    pub async fn request_runtime_status(&self) -> Result<RealTimeStatus> {
        match self.send_request(Request::GetRealTimeStatus).await? {
            Response::RealTimeStatus(status) => Ok(*status),
            _ => Err(SdkError::InvalidResponse),
        }
    }

    /// Start a navigation task over the given waypoints.
    ///
    /// Fire-and-forget: returns once the request is queued. The outcome,
    /// including rejections for an empty waypoint list or a missing
    /// connection, arrives through `callback`, which is invoked exactly
    /// once, on the SDK's reader task when the server answers. The SDK
    /// applies no timeout to this exchange; if the connection drops first,
    /// the callback is dropped without being invoked.
    pub async fn start_nav_task<F>(&self, points: Vec<NavigationPoint>, callback: F)
    where
        F: FnOnce(NavigationResult) + Send + 'static,
    {
        let callback: crate::types::NavigationResultCallback = Box::new(callback);

        let transport = match self.current_transport() {
            Ok(t) => t,
            Err(_) => {
                invoke_nav_callback(callback, rejection(ErrorCode::NotConnected));
                return;
            }
        };

        if points.is_empty() {
            invoke_nav_callback(callback, rejection(ErrorCode::InvalidParam));
            return;
        }

        let seq = self.correlator.next_seq();
        let frame = match (Request::NavigationTask { points })
            .encode()
            .and_then(|body| build_frame(&body, seq))
        {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "navigation request rejected before send");
                invoke_nav_callback(callback, rejection(ErrorCode::InvalidParam));
                return;
            }
        };

        if let Err(callback) = self.correlator.register_async(seq, callback) {
            invoke_nav_callback(callback, rejection(ErrorCode::Failure));
            return;
        }

        if transport.send_frame(frame).await.is_err() {
            if let Some(callback) = self.correlator.take_async(seq) {
                invoke_nav_callback(callback, rejection(ErrorCode::NotConnected));
            }
        }
    }

    /// Cancel the running navigation task.
    ///
    /// `Ok(true)` when the server confirms the cancel, `Ok(false)` when it
    /// reports failure.
    pub async fn cancel_nav_task(&self) -> Result<bool> {
        match self.send_request(Request::CancelTask).await? {
            Response::CancelTask(items) => Ok(items.error_code == 0),
            _ => Err(SdkError::InvalidResponse),
        }
    }

    /// Query the state of the current navigation task.
    pub async fn query_nav_task_status(&self) -> Result<TaskStatusResult> {
        match self.send_request(Request::QueryStatus).await? {
            Response::QueryStatus(items) => Ok(TaskStatusResult {
                value: items.value,
                status: NavigationStatus::from_wire(items.status)?,
                error_code: items.error_code,
                timestamp: wire_timestamp(),
            }),
            _ => Err(SdkError::InvalidResponse),
        }
    }

    /// The blocking request/response exchange shared by the three
    /// synchronous operations.
    ///
    /// Registers a sync waiter, sends, and suspends once on the waiter
    /// with the request timeout. The pending-table slot is released on
    /// every exit path, including early errors and cancellation.
    async fn send_request(&self, request: Request) -> Result<Response> {
        let transport = self.current_transport()?;

        let seq = self.correlator.next_seq();
        let waiter = self
            .correlator
            .register_sync(seq, request.expected_response())?;

        let body = request.encode()?;
        let frame = build_frame(&body, seq)?;
        transport.send_frame(frame).await?;

        waiter.wait(self.options.request_timeout).await
    }

    /// The live transport, or `NotConnected` without touching the network.
    fn current_transport(&self) -> Result<Arc<Transport>> {
        let conn = self.conn.lock().expect("conn lock poisoned");
        match conn.as_ref() {
            Some(t) if t.is_connected() => Ok(Arc::clone(t)),
            _ => Err(SdkError::NotConnected),
        }
    }
}

impl Default for PatrolClient {
    fn default() -> Self {
        Self::new(SdkOptions::default())
    }
}

fn rejection(error_code: ErrorCode) -> NavigationResult {
    NavigationResult {
        value: 0,
        error_code,
        error_status: 0,
        timestamp: wire_timestamp(),
    }
}
