//! SnapshotSink implementations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("observer connection closed")]
    Closed,
}

/// Outbound side of an observer connection.
///
/// `send` hands off one serialized snapshot and returns without waiting for
/// delivery. Also implemented for `Arc<K>` so a sink can be shared for
/// assertions.
pub trait SnapshotSink: Send + Sync {
    fn send(&self, payload: String) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// ChannelSink (production: feeds a connection writer task)
// ---------------------------------------------------------------------------

/// Queues payloads for a writer task that owns the actual connection.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// A sink plus the receiving end for the writer task.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl SnapshotSink for ChannelSink {
    fn send(&self, payload: String) -> Result<(), SinkError> {
        self.tx.send(payload).map_err(|_| SinkError::Closed)
    }
}

// ---------------------------------------------------------------------------
// MemorySink (tests: no connection required)
// ---------------------------------------------------------------------------

/// Records every payload in memory. Can be closed to simulate a dropped
/// observer.
#[derive(Default)]
pub struct MemorySink {
    payloads: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All payloads sent so far, oldest first.
    pub fn payloads(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// All payloads decoded as JSON.
    pub fn snapshots(&self) -> Vec<serde_json::Value> {
        self.lock()
            .iter()
            .filter_map(|p| serde_json::from_str(p).ok())
            .collect()
    }

    pub fn last_snapshot(&self) -> Option<serde_json::Value> {
        self.snapshots().pop()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Reject every later send with `SinkError::Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        // A poisoned log is still a usable log.
        self.payloads.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotSink for MemorySink {
    fn send(&self, payload: String) -> Result<(), SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        self.lock().push(payload);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Arc<K> blanket: lets tests keep a handle on the sink
// ---------------------------------------------------------------------------

impl<K: SnapshotSink + ?Sized> SnapshotSink for Arc<K> {
    fn send(&self, payload: String) -> Result<(), SinkError> {
        (**self).send(payload)
    }
}
