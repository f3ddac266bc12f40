//! Live connection handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::protocol::Frame;

/// A process-local record binding a session to its outbound frame
/// queue. One per open stream; owned by the hub for the stream's
/// lifetime and evicted on disconnect or queue overflow.
#[derive(Debug)]
pub struct ClientHandle {
    /// The session this connection authenticated as.
    pub session_id: String,
    /// Unique per-connection id; used for the per-address slot set.
    pub conn_id: String,
    /// Network address the stream was opened from.
    pub addr: String,
    /// Visibility radius claimed at connect time.
    pub radius: u32,
    /// When the stream was opened.
    pub connected_at: DateTime<Utc>,
    /// Per-connection cancellation handle, child of the process token.
    pub cancel: CancellationToken,
    username: RwLock<String>,
    cell: RwLock<String>,
    tx: mpsc::Sender<Frame>,
    alive: AtomicBool,
}

impl ClientHandle {
    /// Create a handle and the receiving end of its outbound queue.
    pub fn new(
        session_id: &str,
        username: &str,
        cell: &str,
        radius: u32,
        addr: &str,
        queue_capacity: usize,
        shutdown: &CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let handle = Arc::new(Self {
            session_id: session_id.to_string(),
            conn_id: Uuid::new_v4().to_string(),
            addr: addr.to_string(),
            radius,
            connected_at: Utc::now(),
            cancel: shutdown.child_token(),
            username: RwLock::new(username.to_string()),
            cell: RwLock::new(cell.to_string()),
            tx,
            alive: AtomicBool::new(true),
        });
        (handle, rx)
    }

    /// Current display name. Renames during the stream are reflected
    /// into subsequent frames.
    pub fn username(&self) -> String {
        self.username.read().clone()
    }

    pub fn set_username(&self, username: &str) {
        *self.username.write() = username.to_string();
    }

    /// Last-known cell of this connection.
    pub fn cell(&self) -> String {
        self.cell.read().clone()
    }

    pub fn set_cell(&self, cell: &str) {
        *self.cell.write() = cell.to_string();
    }

    /// Enqueue a frame without waiting. A full queue is the caller's
    /// signal to evict: the hub never blocks on a slow consumer.
    pub fn try_send(&self, frame: Frame) -> Result<(), TrySendError<Frame>> {
        if !self.is_alive() {
            return Err(TrySendError::Closed(frame));
        }
        self.tx.try_send(frame)
    }

    /// Best-effort error frame; dropped when the queue is full.
    pub fn send_error(&self, message: &str, code: &str) {
        let _ = self.try_send(Frame::error(message, code));
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Mark the connection dead and cancel its tasks. Idempotent.
    pub fn close(&self) {
        self.alive.store(false, Ordering::Relaxed);
        self.cancel.cancel();
    }
}
