//! Gateway Handlers
//!
//! `POST /user_login`: credential check and chat server handoff.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::debug;
use validator::Validate;

use crate::application::dto::{UserLoginRequest, UserLoginResponse};
use crate::application::services::GatewayError;
use crate::presentation::http::state::GatewayState;
use crate::shared::error::{AppError, ErrorCode};

/// Log a user in and hand back the chat server to connect to.
///
/// Protocol failures are reported in the `error` field with status 200;
/// only backend outages surface as HTTP errors.
pub async fn user_login(
    State(state): State<GatewayState>,
    payload: Result<Json<UserLoginRequest>, JsonRejection>,
) -> Result<Json<UserLoginResponse>, AppError> {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "Malformed login body");
            return Ok(Json(UserLoginResponse::failed(ErrorCode::ErrorJson, "")));
        }
    };

    if let Err(e) = req.validate() {
        debug!(error = %e, "Login body failed validation");
        return Ok(Json(UserLoginResponse::failed(ErrorCode::ErrorJson, req.email)));
    }

    match state.gateway.login(&req.email, &req.passwd).await {
        Ok(handoff) => Ok(Json(UserLoginResponse {
            error: ErrorCode::Success,
            email: handoff.email,
            uid: handoff.uid,
            token: handoff.token,
            host: handoff.host,
            port: handoff.port,
        })),
        Err(GatewayError::Repository(e)) => Err(e),
        Err(e) => Ok(Json(UserLoginResponse::failed(e.code(), req.email))),
    }
}
