//! Execution status channel
//!
//! Progress/outcome notifications emitted during an execution:
//! - StatusEvent: envelope with id + timestamp + kind + message
//! - StatusChannel: thread-safe, append-only log with broadcast fan-out
//!
//! Emission is best-effort: a missing, slow or lagging consumer never blocks
//! or fails the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the broadcast ring; lagging subscribers drop old events
const BROADCAST_CAPACITY: usize = 256;

/// Severity of a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Success,
    Error,
    Warning,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Info => "info",
            StatusKind::Success => "success",
            StatusKind::Error => "error",
            StatusKind::Warning => "warning",
        }
    }
}

/// Single event in the execution status stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since channel creation (ms)
    pub timestamp_ms: u64,
    pub kind: StatusKind,
    pub message: String,
}

/// Synchronous observer, `(status_kind, message)`
pub type StatusCallback = Box<dyn Fn(StatusKind, &str) + Send + Sync>;

/// Thread-safe status channel: retained log + live broadcast + callbacks
#[derive(Clone)]
pub struct StatusChannel {
    events: Arc<RwLock<Vec<StatusEvent>>>,
    callbacks: Arc<RwLock<Vec<StatusCallback>>>,
    sender: broadcast::Sender<StatusEvent>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            callbacks: Arc::new(RwLock::new(Vec::new())),
            sender,
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event. Never blocks; send errors (no receivers) are ignored.
    pub fn emit(&self, kind: StatusKind, message: impl Into<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = StatusEvent {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
            message: message.into(),
        };

        for callback in self.callbacks.read().iter() {
            callback(event.kind, &event.message);
        }
        let _ = self.sender.send(event.clone());
        self.events.write().push(event);
        id
    }

    /// Register a synchronous observer for every subsequent event
    pub fn on_status(&self, callback: impl Fn(StatusKind, &str) + Send + Sync + 'static) {
        self.callbacks.write().push(Box::new(callback));
    }

    /// Subscribe to live events. Bounded: a lagging receiver loses the
    /// oldest events rather than stalling emission.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.read().clone()
    }

    /// Events of one kind
    pub fn filter_kind(&self, kind: StatusKind) -> Vec<StatusEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}
