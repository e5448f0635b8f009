//! TCP transport: connection lifecycle, single-writer send path, receive
//! loop.
//!
//! The transport owns exactly one socket. Its write half belongs to a
//! dedicated writer task fed by an mpsc channel, so frames from any caller
//! are written whole and in submission order. Its read half belongs to the
//! reader task, which reassembles frames, decodes bodies and hands them to
//! the correlator.
//!
//! Any fatal condition (peer close, I/O error, invalid sync word) tears
//! the connection down: the connected flag drops, both tasks stop, and the
//! correlator is drained so every blocked waiter wakes immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::codec;
use crate::correlator::Correlator;
use crate::error::{Result, SdkError};
use crate::protocol::FrameBuffer;

/// Outbound queue depth before senders are backpressured.
const SEND_QUEUE_DEPTH: usize = 64;

/// Read buffer size for the receive loop.
const READ_BUF_SIZE: usize = 4096;

/// State shared between the transport handle and its two tasks.
struct Shared {
    connected: AtomicBool,
    correlator: Arc<Correlator>,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    /// Transition to `Disconnected`. Returns false when already down.
    ///
    /// Signals both tasks, then drains the correlator so sync waiters wake
    /// with a terminal outcome and async callbacks are dropped.
    fn tear_down(&self) -> bool {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return false;
        }
        let _ = self.shutdown.send(true);
        self.correlator.drain();
        tracing::debug!("connection torn down");
        true
    }
}

/// A live TCP connection to the control server.
pub(crate) struct Transport {
    shared: Arc<Shared>,
    frame_tx: mpsc::Sender<Vec<u8>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
    /// Establish a connection within `connect_timeout` and start the
    /// reader and writer tasks.
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        correlator: Arc<Correlator>,
    ) -> Result<Self> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SdkError::Timeout)??;

        tracing::info!(host, port, "connected");

        let (read_half, write_half) = stream.into_split();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (frame_tx, frame_rx) = mpsc::channel(SEND_QUEUE_DEPTH);

        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            correlator,
            shutdown: shutdown_tx,
        });

        let reader = tokio::spawn(read_loop(
            read_half,
            Arc::clone(&shared),
            shutdown_rx.clone(),
        ));
        let writer = tokio::spawn(write_loop(
            write_half,
            frame_rx,
            Arc::clone(&shared),
            shutdown_rx,
        ));

        Ok(Self {
            shared,
            frame_tx,
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Whether the connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Queue an already-encoded frame for sending.
    ///
    /// Frames are written in submission order by the writer task.
    pub async fn send_frame(&self, frame: Vec<u8>) -> Result<()> {
        if !self.is_connected() {
            return Err(SdkError::NotConnected);
        }
        self.frame_tx
            .send(frame)
            .await
            .map_err(|_| SdkError::NotConnected)
    }

    /// Shut the connection down and wait for both tasks to stop.
    ///
    /// Idempotent: later calls are no-ops and do not block.
    pub async fn shutdown(&self) {
        self.shared.tear_down();

        if let Some(handle) = self.reader.lock().await.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.writer.lock().await.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // Signals both tasks to stop; they cannot be awaited here.
        self.shared.tear_down();
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    shared: Arc<Shared>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut frame_buffer = FrameBuffer::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = tokio::select! {
            _ = shutdown_rx.changed() => break,
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::info!("peer closed connection");
                    shared.tear_down();
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::error!(error = %e, "read error");
                    shared.tear_down();
                    break;
                }
            },
        };

        let frames = match frame_buffer.push(&buf[..n]) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::error!(error = %e, "fatal stream error");
                shared.tear_down();
                break;
            }
        };

        for frame in frames {
            match codec::decode_response(frame.body()) {
                Ok(response) => shared.correlator.dispatch(frame.sequence(), response),
                Err(e) => {
                    tracing::warn!(
                        seq = frame.sequence(),
                        error = %e,
                        "dropping undecodable body"
                    );
                }
            }
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut frame_rx: mpsc::Receiver<Vec<u8>>,
    shared: Arc<Shared>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let frame = tokio::select! {
            _ = shutdown_rx.changed() => break,
            frame = frame_rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        if let Err(e) = writer.write_all(&frame).await {
            tracing::error!(error = %e, "write error");
            shared.tear_down();
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn local_server() -> (TcpListener, String, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr.ip().to_string(), addr.port())
    }

    #[tokio::test]
    async fn connect_and_disconnect() {
        let (listener, host, port) = local_server().await;
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let correlator = Arc::new(Correlator::new());
        let transport = Transport::connect(&host, port, Duration::from_secs(1), correlator)
            .await
            .unwrap();
        let _peer = accept.await.unwrap();

        assert!(transport.is_connected());
        transport.shutdown().await;
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (listener, host, port) = local_server().await;
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let correlator = Arc::new(Correlator::new());
        let transport = Transport::connect(&host, port, Duration::from_secs(1), correlator)
            .await
            .unwrap();
        let _peer = accept.await.unwrap();

        transport.shutdown().await;
        // Second call must return without blocking.
        transport.shutdown().await;
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn connect_times_out() {
        // RFC 5737 TEST-NET-1: guaranteed unroutable.
        let correlator = Arc::new(Correlator::new());
        let result = Transport::connect(
            "192.0.2.1",
            9,
            Duration::from_millis(50),
            correlator,
        )
        .await;

        assert!(matches!(result, Err(SdkError::Timeout) | Err(SdkError::Io(_))));
    }

    #[tokio::test]
    async fn peer_close_transitions_to_disconnected() {
        let (listener, host, port) = local_server().await;
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let correlator = Arc::new(Correlator::new());
        let transport = Transport::connect(&host, port, Duration::from_secs(1), correlator)
            .await
            .unwrap();

        let (peer, _) = accept.await.unwrap();
        drop(peer);

        // The reader observes EOF and tears down.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send_frame(vec![0u8; 4]).await,
            Err(SdkError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn frames_are_written_in_order() {
        let (listener, host, port) = local_server().await;
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let correlator = Arc::new(Correlator::new());
        let transport = Transport::connect(&host, port, Duration::from_secs(1), correlator)
            .await
            .unwrap();
        let (mut peer, _) = accept.await.unwrap();

        transport.send_frame(b"one".to_vec()).await.unwrap();
        transport.send_frame(b"two".to_vec()).await.unwrap();
        transport.send_frame(b"three".to_vec()).await.unwrap();

        let mut received = vec![0u8; 11];
        peer.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"onetwothree");

        transport.shutdown().await;
    }
}
