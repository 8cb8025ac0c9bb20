//! Login tokens handed from the directory to clients and chat servers.

use async_trait::async_trait;

use crate::shared::error::AppError;

/// Generate a fresh opaque token.
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Shared uid -> token store.
///
/// Holds exactly one token per uid; a new token overwrites the previous one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store `token` as the only valid token for `uid`.
    async fn put_token(&self, uid: i64, token: &str) -> Result<(), AppError>;

    /// The currently valid token for `uid`, if any.
    async fn get_token(&self, uid: i64) -> Result<Option<String>, AppError>;
}
