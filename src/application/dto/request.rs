//! Request DTOs
//!
//! Bodies of HTTP requests, directory RPC calls and chat frames sent by
//! clients.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Gateway login request
#[derive(Debug, Deserialize, Validate)]
pub struct UserLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub passwd: String,
}

/// Directory `GetChatServer` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChatServerRequest {
    pub uid: i64,
}

/// Directory `Login` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub uid: i64,
    pub token: String,
}

/// First frame a chat client sends after connecting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLoginRequest {
    pub uid: i64,
    pub token: String,
}

/// One chat line inside a text message frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub msgid: String,
    pub content: String,
}

/// Text message from one user to another.
///
/// Relayed unchanged to the recipient as the notify body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChatMsgRequest {
    pub fromuid: i64,
    pub touid: i64,
    pub text_array: Vec<TextMessage>,
}

/// Heartbeat frame body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub fromuid: Option<i64>,
}
