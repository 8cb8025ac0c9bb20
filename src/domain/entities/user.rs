//! User credentials and the repository trait the gateway checks them with.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// The slice of a user account the gateway needs for a login.
///
/// Maps to the `users` table:
/// - uid: BIGINT PRIMARY KEY
/// - name: VARCHAR NOT NULL
/// - email: VARCHAR NOT NULL UNIQUE
/// - pwd: VARCHAR NOT NULL (argon2 PHC string)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub uid: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Database collaborator used by the gateway's credential check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by login email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, AppError>;
}
