//! Directory RPC surface.
//!
//! Implemented in-process by [`DirectoryService`] and remotely by the
//! pooled HTTP client the gateway and chat servers use.
//!
//! [`DirectoryService`]: super::DirectoryService

use async_trait::async_trait;

use crate::application::dto::{GetChatServerResponse, LoginResponse};

/// Calls served by the directory.
///
/// Failures are reported through the `error` field of the reply, never as a
/// transport-level error crossing the process boundary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Pick the least-loaded chat server for `uid` and issue it a token.
    async fn get_chat_server(&self, uid: i64) -> GetChatServerResponse;

    /// Check a token presented to a chat server.
    async fn login(&self, uid: i64, token: &str) -> LoginResponse;
}
