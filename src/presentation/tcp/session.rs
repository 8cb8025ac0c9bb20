//! Chat Session State
//!
//! One [`Session`] per TCP connection. The connection driver owns the socket;
//! the registry and the logic layer hold `Arc<Session>` handles to look the
//! session up, queue frames for it, and close it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::warn;

use super::frame::Frame;
use crate::infrastructure::metrics;

/// Lifecycle of a session's socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Open,
    /// Close was requested; queued frames are being flushed.
    Closing,
    /// The socket has been released.
    Closed,
}

#[derive(Debug)]
pub struct Session {
    id: String,
    user_id: Mutex<Option<i64>>,
    last_heartbeat: Mutex<Instant>,
    phase: watch::Sender<SessionPhase>,
    outbound: mpsc::Sender<Frame>,
}

impl Session {
    /// Create a session and the receiving end of its send queue.
    ///
    /// The queue holds at most `max_send_queue` frames.
    pub fn new(id: impl Into<String>, max_send_queue: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (outbound, queue) = mpsc::channel(max_send_queue.max(1));
        let (phase, _) = watch::channel(SessionPhase::Open);
        let session = Self {
            id: id.into(),
            user_id: Mutex::new(None),
            last_heartbeat: Mutex::new(Instant::now()),
            phase,
            outbound,
        };
        (Arc::new(session), queue)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Authenticated user, absent until login completes.
    pub fn user_id(&self) -> Option<i64> {
        *self.user_id.lock()
    }

    pub fn bind_user(&self, uid: i64) {
        *self.user_id.lock() = Some(uid);
    }

    /// Queue a frame for the writer.
    ///
    /// Returns false if the frame was not queued: the session is no longer
    /// open or its queue is full.
    pub fn send(&self, frame: Frame) -> bool {
        if self.phase() != SessionPhase::Open {
            return false;
        }

        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                warn!(
                    session_id = %self.id,
                    msg_id = frame.id,
                    "Send queue full, dropping frame"
                );
                metrics::record_frame_dropped();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Serialize `body` and queue it.
    pub fn send_json<T: Serialize>(&self, id: u16, body: &T) -> bool {
        match Frame::json(id, body) {
            Ok(frame) => self.send(frame),
            Err(e) => {
                warn!(session_id = %self.id, msg_id = id, error = %e, "Failed to encode frame body");
                false
            }
        }
    }

    /// Record traffic from the peer.
    pub fn touch(&self) {
        *self.last_heartbeat.lock() = Instant::now();
    }

    pub fn last_heartbeat(&self) -> Instant {
        *self.last_heartbeat.lock()
    }

    /// True once the peer has been silent for longer than `threshold`.
    pub fn is_expired(&self, now: Instant, threshold: Duration) -> bool {
        now.saturating_duration_since(self.last_heartbeat()) > threshold
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    pub fn is_closing(&self) -> bool {
        self.phase() != SessionPhase::Open
    }

    /// Ask the session to close. Only the first caller gets `true`.
    pub fn close(&self) -> bool {
        self.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Open {
                *phase = SessionPhase::Closing;
                true
            } else {
                false
            }
        })
    }

    /// Called by the connection driver once the socket is gone.
    pub(crate) fn mark_closed(&self) {
        self.phase.send_replace(SessionPhase::Closed);
    }

    /// Resolves once close has been requested.
    pub async fn closing(&self) {
        let mut rx = self.phase.subscribe();
        let _ = rx.wait_for(|phase| *phase != SessionPhase::Open).await;
    }

    /// Resolves once the socket has been released.
    pub async fn closed(&self) {
        let mut rx = self.phase.subscribe();
        let _ = rx.wait_for(|phase| *phase == SessionPhase::Closed).await;
    }
}
