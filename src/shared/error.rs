//! Application Error Types
//!
//! Centralized error handling with Axum integration, plus the numeric
//! error codes carried in gateway, directory and chat payloads.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes shared by every service on the wire.
///
/// Serialized as the bare integer so clients can switch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    ErrorJson = 1001,
    RpcFailed = 1002,
    VarifyExpired = 1003,
    VarifyCodeErr = 1004,
    UserExist = 1005,
    PasswdErr = 1006,
    EmailNotMatch = 1007,
    PasswdUpFailed = 1008,
    PasswdInvalid = 1009,
    TokenInvalid = 1010,
    UidInvalid = 1011,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let value = match code {
            0 => ErrorCode::Success,
            1001 => ErrorCode::ErrorJson,
            1002 => ErrorCode::RpcFailed,
            1003 => ErrorCode::VarifyExpired,
            1004 => ErrorCode::VarifyCodeErr,
            1005 => ErrorCode::UserExist,
            1006 => ErrorCode::PasswdErr,
            1007 => ErrorCode::EmailNotMatch,
            1008 => ErrorCode::PasswdUpFailed,
            1009 => ErrorCode::PasswdInvalid,
            1010 => ErrorCode::TokenInvalid,
            1011 => ErrorCode::UidInvalid,
            _ => return None,
        };
        Some(value)
    }

    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i32::deserialize(deserializer)?;
        ErrorCode::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown error code {}", code)))
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl AppError {
    /// Error raised when a pool hands back nothing because it was closed.
    pub fn pool_closed(pool: &str) -> Self {
        AppError::Unavailable(format!("{} pool is closed", pool))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    10008,
                    "Service unavailable".into(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
        };

        let body = ErrorResponse { code, message };

        (status, Json(body)).into_response()
    }
}
