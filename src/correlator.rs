//! Request correlation: sequence numbers and the two routing tables.
//!
//! Every outbound request carries a 16-bit sequence number which the
//! server echoes in its response. Inbound responses are routed by that
//! number through one of two tables:
//!
//! - the **sync pending table**, holding a one-shot wake primitive per
//!   blocking call in flight;
//! - the **async callback table**, holding the user callback for a
//!   navigation task whose response may arrive minutes later.
//!
//! Each table has its own lock; a dispatch touches at most one of them and
//! never holds a lock across a user callback. An entry is consumed by at
//! most one dispatch: routing removes it from the table before delivering,
//! so a duplicate sequence number cannot fire twice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::callback::invoke_nav_callback;
use crate::codec::{MessageType, Response};
use crate::error::{Result, SdkError};
use crate::types::{wire_timestamp, ErrorCode, NavigationResult, NavigationResultCallback};

struct SyncEntry {
    /// The response kind this waiter accepts.
    expected: MessageType,
    /// Single-shot wake primitive; consumed by the dispatch that matches.
    tx: oneshot::Sender<Response>,
}

/// Owns the sequence counter and both routing tables.
pub(crate) struct Correlator {
    next_seq: AtomicU16,
    sync_table: Mutex<HashMap<u16, SyncEntry>>,
    async_table: Mutex<HashMap<u16, NavigationResultCallback>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicU16::new(0),
            sync_table: Mutex::new(HashMap::new()),
            async_table: Mutex::new(HashMap::new()),
        }
    }

    /// Next sequence number. Wraps around at `u16::MAX`; the tables detect
    /// collisions on insert.
    pub fn next_seq(&self) -> u16 {
        self.next_seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Register a sync waiter for `seq`.
    ///
    /// # Errors
    ///
    /// [`SdkError::Protocol`] if an entry for `seq` already exists (a
    /// wraparound collision); the caller surfaces it without waiting.
    pub fn register_sync(
        self: &Arc<Self>,
        seq: u16,
        expected: MessageType,
    ) -> Result<SyncWaiter> {
        let (tx, rx) = oneshot::channel();

        let mut table = self.sync_table.lock().expect("sync table poisoned");
        if table.contains_key(&seq) {
            tracing::warn!(seq, "sequence number collision in sync table");
            return Err(SdkError::Protocol(format!(
                "sequence number {seq} already in flight"
            )));
        }
        table.insert(seq, SyncEntry { expected, tx });
        tracing::trace!(seq, ?expected, in_flight = table.len(), "registered sync waiter");

        Ok(SyncWaiter {
            rx,
            guard: SyncGuard {
                seq,
                correlator: Arc::clone(self),
            },
        })
    }

    /// Register an async navigation callback for `seq`.
    ///
    /// On a wraparound collision the callback is handed back so the caller
    /// can still deliver a rejection through it.
    pub fn register_async(
        &self,
        seq: u16,
        callback: NavigationResultCallback,
    ) -> std::result::Result<(), NavigationResultCallback> {
        let mut table = self.async_table.lock().expect("async table poisoned");
        if table.contains_key(&seq) {
            tracing::warn!(seq, "sequence number collision in async table");
            return Err(callback);
        }
        table.insert(seq, callback);
        Ok(())
    }

    /// Remove a registered async callback, e.g. when the send failed after
    /// registration.
    pub fn take_async(&self, seq: u16) -> Option<NavigationResultCallback> {
        self.async_table.lock().expect("async table poisoned").remove(&seq)
    }

    /// Route one inbound response.
    ///
    /// Navigation task responses consume the async entry for their
    /// sequence number and run the user callback. Everything else wakes
    /// the sync waiter whose sequence number *and* expected kind match.
    /// Mismatched or unsolicited responses are dropped.
    pub fn dispatch(&self, seq: u16, response: Response) {
        let kind = response.message_type();

        if kind == MessageType::NavigationTaskResp {
            let callback = self.async_table.lock().expect("async table poisoned").remove(&seq);
            match callback {
                Some(cb) => {
                    let Response::NavigationTask(items) = response else {
                        unreachable!("kind checked above");
                    };
                    let result = NavigationResult {
                        value: items.value,
                        error_code: ErrorCode::from_wire(items.error_code),
                        error_status: items.error_status,
                        timestamp: wire_timestamp(),
                    };
                    invoke_nav_callback(cb, result);
                }
                None => {
                    tracing::debug!(seq, "navigation response without registered callback");
                }
            }
            return;
        }

        let entry = {
            let mut table = self.sync_table.lock().expect("sync table poisoned");
            match table.get(&seq) {
                Some(e) if e.expected == kind => table.remove(&seq),
                Some(e) => {
                    tracing::debug!(
                        seq,
                        expected = ?e.expected,
                        got = ?kind,
                        "response kind mismatch, dropping"
                    );
                    None
                }
                None => {
                    tracing::debug!(seq, ?kind, "unsolicited response, dropping");
                    None
                }
            }
        };

        if let Some(e) = entry {
            // Receiver may have timed out between removal and send.
            let _ = e.tx.send(response);
        }
    }

    /// Tear down both tables on shutdown.
    ///
    /// Dropping the sync senders wakes every blocked waiter immediately
    /// with a terminal outcome. Async callbacks are dropped without being
    /// invoked; no result is synthesized for them.
    pub fn drain(&self) {
        let drained: Vec<u16> = {
            let mut table = self.sync_table.lock().expect("sync table poisoned");
            table.drain().map(|(seq, _)| seq).collect()
        };
        if !drained.is_empty() {
            tracing::debug!(waiters = drained.len(), "drained sync waiters on shutdown");
        }

        let dropped = {
            let mut table = self.async_table.lock().expect("async table poisoned");
            let n = table.len();
            table.clear();
            n
        };
        if dropped > 0 {
            tracing::debug!(callbacks = dropped, "dropped async callbacks on shutdown");
        }
    }

    /// Number of sync requests currently in flight.
    pub fn pending_sync_count(&self) -> usize {
        self.sync_table.lock().expect("sync table poisoned").len()
    }

    #[cfg(test)]
    fn pending_async_count(&self) -> usize {
        self.async_table.lock().expect("async table poisoned").len()
    }
}

/// Removes the pending-table slot for one blocking call on every exit
/// path: response, timeout, error, or cancellation of the waiting future.
struct SyncGuard {
    seq: u16,
    correlator: Arc<Correlator>,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        // No-op when dispatch already consumed the entry.
        let mut table = self
            .correlator
            .sync_table
            .lock()
            .expect("sync table poisoned");
        table.remove(&self.seq);
    }
}

/// Handle held by a blocking call while its request is in flight.
pub(crate) struct SyncWaiter {
    rx: oneshot::Receiver<Response>,
    guard: SyncGuard,
}

impl SyncWaiter {
    /// Suspend until the matching response arrives or `timeout` elapses.
    ///
    /// Consumes the waiter; its table slot is removed when this returns,
    /// whatever the outcome.
    pub async fn wait(self, timeout: Duration) -> Result<Response> {
        let SyncWaiter { rx, guard } = self;
        let _guard = guard;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            // Sender dropped: the connection was torn down.
            Ok(Err(_)) => Err(SdkError::NotConnected),
            Err(_) => Err(SdkError::Timeout),
        }
    }
}
