//! Gateway Service
//!
//! Turns a credential check into a chat server handoff: verify the password
//! against the user store, then ask the directory for a server and a token.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::DirectoryApi;
use crate::domain::UserRepository;
use crate::shared::error::{AppError, ErrorCode};

/// Everything a client needs to open its chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handoff {
    pub uid: i64,
    pub email: String,
    pub host: String,
    pub port: u16,
    pub token: String,
}

/// Gateway errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Directory call failed with code {0:?}")]
    Directory(ErrorCode),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl GatewayError {
    /// Code reported to the client in the login response.
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::InvalidCredentials => ErrorCode::PasswdInvalid,
            GatewayError::Directory(_) | GatewayError::Repository(_) => ErrorCode::RpcFailed,
        }
    }
}

pub struct GatewayService {
    users: Arc<dyn UserRepository>,
    directory: Arc<dyn DirectoryApi>,
}

impl GatewayService {
    pub fn new(users: Arc<dyn UserRepository>, directory: Arc<dyn DirectoryApi>) -> Self {
        Self { users, directory }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Handoff, GatewayError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(GatewayError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(GatewayError::InvalidCredentials);
        }

        let reply = self.directory.get_chat_server(user.uid).await;
        if !reply.error.is_success() {
            warn!(uid = user.uid, code = ?reply.error, "Directory refused chat server request");
            return Err(GatewayError::Directory(reply.error));
        }

        info!(uid = user.uid, host = %reply.host, port = reply.port, "Login handed off");
        Ok(Handoff {
            uid: user.uid,
            email: user.email,
            host: reply.host,
            port: reply.port,
            token: reply.token,
        })
    }
}

/// Check a password against a stored argon2 PHC string.
///
/// A malformed stored hash counts as a mismatch.
fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}
