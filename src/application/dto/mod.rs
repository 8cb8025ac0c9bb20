//! Data Transfer Objects
//!
//! JSON bodies shared by the gateway API, the directory RPC surface and the
//! chat frame protocol.

pub mod request;
pub mod response;

pub use request::{
    ChatLoginRequest, GetChatServerRequest, HeartbeatRequest, LoginRequest, TextChatMsgRequest,
    TextMessage, UserLoginRequest,
};
pub use response::{
    ChatLoginResponse, GetChatServerResponse, HeartbeatResponse, LoginResponse, NotifyOffline,
    TextChatMsgResponse, UserLoginResponse,
};
