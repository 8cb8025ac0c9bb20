//! Response DTOs
//!
//! Every response carries an `error` code; `ErrorCode::Success` (0) means
//! the remaining fields are meaningful.

use serde::{Deserialize, Serialize};

use crate::shared::error::ErrorCode;

/// Gateway login response with the chat server handoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginResponse {
    pub error: ErrorCode,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub uid: i64,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
}

impl UserLoginResponse {
    pub fn failed(error: ErrorCode, email: impl Into<String>) -> Self {
        Self {
            error,
            email: email.into(),
            uid: 0,
            token: String::new(),
            host: String::new(),
            port: 0,
        }
    }
}

/// Directory `GetChatServer` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChatServerResponse {
    pub error: ErrorCode,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub token: String,
}

impl GetChatServerResponse {
    pub fn failed(error: ErrorCode) -> Self {
        Self {
            error,
            host: String::new(),
            port: 0,
            token: String::new(),
        }
    }
}

/// Directory `Login` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub error: ErrorCode,
    pub uid: i64,
    pub token: String,
}

/// Chat server reply to `ChatLoginRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLoginResponse {
    pub error: ErrorCode,
    pub uid: i64,
}

/// Sender acknowledgement for a text message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChatMsgResponse {
    pub error: ErrorCode,
    pub touid: i64,
    /// False when the recipient has no session on this server
    pub delivered: bool,
}

/// Sent to a session that was replaced by a newer login for the same user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyOffline {
    pub error: ErrorCode,
    pub uid: i64,
}

/// Heartbeat reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub error: ErrorCode,
}
