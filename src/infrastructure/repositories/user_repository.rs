//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait, running on a
//! connection checked out of the shared resource pool.

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{UserCredentials, UserRepository};
use crate::infrastructure::database::{is_connection_error, PgResourcePool};
use crate::shared::error::AppError;

/// Database row representation matching the users table schema.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    uid: i64,
    name: String,
    email: String,
    pwd: String,
}

impl UserRow {
    fn into_credentials(self) -> UserCredentials {
        UserCredentials {
            uid: self.uid,
            name: self.name,
            email: self.email,
            password_hash: self.pwd,
        }
    }
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgResourcePool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository over the given resource pool.
    pub fn new(pool: PgResourcePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .ok_or_else(|| AppError::pool_closed(self.pool.name()))?;

        let result = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT uid, name, email, pwd
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *conn)
        .await;

        match result {
            Ok(row) => Ok(row.map(UserRow::into_credentials)),
            Err(e) => {
                if is_connection_error(&e) {
                    warn!(error = %e, "Dropping broken PostgreSQL connection");
                    conn.invalidate();
                }
                Err(e.into())
            }
        }
    }
}
