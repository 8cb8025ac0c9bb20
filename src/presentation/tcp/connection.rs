//! Connection driver.
//!
//! Runs one session over any byte stream. The read half decodes frames and
//! hands them to [`ChatLogic`]; the write half drains the session's queue one
//! frame at a time, so outbound frames hit the socket in enqueue order and
//! never interleave.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::Receiver;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::frame::{Frame, FrameCodec, FrameError};
use super::logic::ChatLogic;
use super::session::Session;
use crate::config::ChatSettings;
use crate::infrastructure::metrics;

/// Per-connection protocol limits.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_body_len: usize,
    pub max_send_queue: usize,
    /// Longest a single write, or the flush after a close, may take
    pub write_timeout: Duration,
}

impl From<&ChatSettings> for SessionLimits {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            max_body_len: settings.max_body_len,
            max_send_queue: settings.max_send_queue,
            write_timeout: settings.write_timeout(),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    ProtocolViolation,
    TransportError,
    /// Closed from this side: eviction, heartbeat sweep, shutdown, or a
    /// failed write.
    Local,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::PeerClosed => "peer_closed",
            CloseReason::ProtocolViolation => "protocol_violation",
            CloseReason::TransportError => "transport_error",
            CloseReason::Local => "local",
        }
    }
}

/// Open a session for an accepted socket and drive it to completion.
#[instrument(skip_all, fields(peer = %peer))]
pub async fn run_connection<S>(stream: S, peer: SocketAddr, logic: Arc<ChatLogic>, limits: SessionLimits)
where
    S: AsyncRead + AsyncWrite,
{
    let (session, queue) = Session::new(Uuid::new_v4().to_string(), limits.max_send_queue);
    logic.registry().insert(Arc::clone(&session));
    debug!(session_id = %session.id(), "Session opened");

    serve_session(stream, session, queue, &logic, limits).await;
}

/// Drive an already registered session until either side closes it.
///
/// Returns once the socket has been released and the session unregistered.
/// A peer that stops reading holds the socket for at most one write timeout
/// past the close.
pub async fn serve_session<S>(
    stream: S,
    session: Arc<Session>,
    queue: Receiver<Frame>,
    logic: &ChatLogic,
    limits: SessionLimits,
) -> CloseReason
where
    S: AsyncRead + AsyncWrite,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let reader = FramedRead::new(read_half, FrameCodec::new(limits.max_body_len));
    let writer = FramedWrite::new(write_half, FrameCodec::new(limits.max_body_len));

    let (reason, ()) = tokio::join!(
        read_loop(&session, reader, logic),
        write_loop(&session, writer, queue, limits.write_timeout)
    );

    session.mark_closed();
    metrics::record_session_close(reason.as_str());
    logic.on_session_closed(&session).await;
    info!(
        session_id = %session.id(),
        user_id = ?session.user_id(),
        reason = reason.as_str(),
        "Session closed"
    );
    reason
}

async fn read_loop<R>(
    session: &Arc<Session>,
    mut reader: FramedRead<R, FrameCodec>,
    logic: &ChatLogic,
) -> CloseReason
where
    R: AsyncRead + Unpin,
{
    let closing = session.closing();
    tokio::pin!(closing);

    let reason = loop {
        tokio::select! {
            _ = &mut closing => break CloseReason::Local,
            next = reader.next() => match next {
                Some(Ok(frame)) => {
                    session.touch();
                    metrics::record_frame_in();
                    logic.dispatch(session, frame).await;
                }
                Some(Err(FrameError::TooLong { len, max })) => {
                    warn!(session_id = %session.id(), len, max, "Declared frame length over limit, closing session");
                    break CloseReason::ProtocolViolation;
                }
                Some(Err(FrameError::Io(e))) => {
                    debug!(session_id = %session.id(), error = %e, "Read failed");
                    break CloseReason::TransportError;
                }
                None => break CloseReason::PeerClosed,
            },
        }
    };

    session.close();
    reason
}

async fn write_loop<W>(
    session: &Arc<Session>,
    mut writer: FramedWrite<W, FrameCodec>,
    mut queue: Receiver<Frame>,
    write_timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    let closing = session.closing();
    tokio::pin!(closing);

    loop {
        tokio::select! {
            biased;
            frame = queue.recv() => match frame {
                Some(frame) => {
                    let write = write_frame(session, &mut writer, frame);
                    match timeout(write_timeout, write).await {
                        Ok(true) => {}
                        Ok(false) => {
                            session.close();
                            return;
                        }
                        Err(_) => {
                            warn!(session_id = %session.id(), "Peer not reading, write timed out");
                            session.close();
                            return;
                        }
                    }
                }
                None => break,
            },
            _ = &mut closing => break,
        }
    }

    // Flush whatever was queued before the close, then release the socket.
    queue.close();
    let flush = async {
        while let Some(frame) = queue.recv().await {
            if !write_frame(session, &mut writer, frame).await {
                return;
            }
        }
        if let Err(e) = writer.close().await {
            debug!(session_id = %session.id(), error = %e, "Shutdown of write half failed");
        }
    };
    if timeout(write_timeout, flush).await.is_err() {
        warn!(session_id = %session.id(), "Flush on close timed out, releasing socket");
    }
}

/// Write one frame. Returns false when the socket is no longer writable.
async fn write_frame<W>(session: &Session, writer: &mut FramedWrite<W, FrameCodec>, frame: Frame) -> bool
where
    W: AsyncWrite + Unpin,
{
    let msg_id = frame.id;
    match writer.send(frame).await {
        Ok(()) => {
            metrics::record_frame_out();
            true
        }
        Err(FrameError::TooLong { len, max }) => {
            warn!(session_id = %session.id(), msg_id, len, max, "Outbound frame over limit, dropped");
            true
        }
        Err(FrameError::Io(e)) => {
            debug!(session_id = %session.id(), error = %e, "Write failed");
            false
        }
    }
}
