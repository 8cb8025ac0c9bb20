//! Chat wire framing.
//!
//! Every frame, in both directions, is
//!
//! ```text
//! +----------------+-----------------+----------------------+
//! | message_id u16 | body_length u16 | body (body_length B) |
//! +----------------+-----------------+----------------------+
//! ```
//!
//! with both integers big-endian. Bodies are JSON.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_WIRE_BODY_LEN;

/// Size of the fixed frame header.
pub const HEADER_LEN: usize = 4;

/// Message identifiers understood by the chat server.
pub mod message_id {
    pub const CHAT_LOGIN: u16 = 1005;
    pub const CHAT_LOGIN_RSP: u16 = 1006;
    pub const TEXT_CHAT_MSG_REQ: u16 = 1017;
    pub const TEXT_CHAT_MSG_RSP: u16 = 1018;
    pub const NOTIFY_TEXT_CHAT_MSG: u16 = 1019;
    pub const NOTIFY_OFFLINE: u16 = 1021;
    pub const HEARTBEAT_REQ: u16 = 1023;
    pub const HEARTBEAT_RSP: u16 = 1024;
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u16,
    pub body: Bytes,
}

impl Frame {
    pub fn new(id: u16, body: impl Into<Bytes>) -> Self {
        Self {
            id,
            body: body.into(),
        }
    }

    /// Build a frame with a JSON body.
    pub fn json<T: Serialize>(id: u16, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(id, serde_json::to_vec(body)?))
    }

    /// Parse the JSON body.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame body of {len} bytes exceeds the {max} byte limit")]
    TooLong { len: usize, max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where the decoder is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    AwaitingHeader,
    AwaitingBody { id: u16, len: usize },
}

/// `tokio_util` codec for chat frames.
///
/// The decoder rejects a declared length above `max_body_len` as soon as the
/// header arrives, before any of the body is buffered.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_body_len: usize,
    state: ReadState,
}

impl FrameCodec {
    /// `max_body_len` is clamped to what the 16-bit length field can carry.
    pub fn new(max_body_len: usize) -> Self {
        Self {
            max_body_len: max_body_len.min(MAX_WIRE_BODY_LEN),
            state: ReadState::AwaitingHeader,
        }
    }

    pub fn max_body_len(&self) -> usize {
        self.max_body_len
    }

    pub fn read_state(&self) -> ReadState {
        self.state
    }

    fn decode_head(&mut self, src: &mut BytesMut) -> Result<Option<(u16, usize)>, FrameError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let id = src.get_u16();
        let len = src.get_u16() as usize;
        if len > self.max_body_len {
            return Err(FrameError::TooLong {
                len,
                max: self.max_body_len,
            });
        }

        // Make room for the body so the next read can fill it in one go.
        src.reserve(len);
        Ok(Some((id, len)))
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let (id, len) = match self.state {
            ReadState::AwaitingHeader => match self.decode_head(src)? {
                Some(head) => {
                    self.state = ReadState::AwaitingBody {
                        id: head.0,
                        len: head.1,
                    };
                    head
                }
                None => return Ok(None),
            },
            ReadState::AwaitingBody { id, len } => (id, len),
        };

        if src.len() < len {
            return Ok(None);
        }

        let body = src.split_to(len).freeze();
        self.state = ReadState::AwaitingHeader;
        src.reserve(HEADER_LEN);
        Ok(Some(Frame { id, body }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        let len = frame.body.len();
        if len > self.max_body_len {
            return Err(FrameError::TooLong {
                len,
                max: self.max_body_len,
            });
        }

        dst.reserve(HEADER_LEN + len);
        dst.put_u16(frame.id);
        dst.put_u16(len as u16);
        dst.extend_from_slice(&frame.body);
        Ok(())
    }
}
