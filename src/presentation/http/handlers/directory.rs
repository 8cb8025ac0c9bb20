//! Directory RPC Handlers
//!
//! JSON endpoints backing `DirectoryApi` for remote callers. A malformed
//! body is answered in-band with `ErrorJson`, never with an HTTP rejection.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::debug;

use crate::application::dto::{
    GetChatServerRequest, GetChatServerResponse, LoginRequest, LoginResponse,
};
use crate::application::services::DirectoryApi;
use crate::presentation::http::state::DirectoryState;
use crate::shared::error::ErrorCode;

/// Select a chat server for the user and issue a login token.
pub async fn get_chat_server(
    State(state): State<DirectoryState>,
    payload: Result<Json<GetChatServerRequest>, JsonRejection>,
) -> Json<GetChatServerResponse> {
    match payload {
        Ok(Json(req)) => Json(state.directory.get_chat_server(req.uid).await),
        Err(rejection) => {
            debug!(error = %rejection, "Malformed get_chat_server body");
            Json(GetChatServerResponse::failed(ErrorCode::ErrorJson))
        }
    }
}

/// Validate a token presented to a chat server.
pub async fn login(
    State(state): State<DirectoryState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Json<LoginResponse> {
    match payload {
        Ok(Json(req)) => Json(state.directory.login(req.uid, &req.token).await),
        Err(rejection) => {
            debug!(error = %rejection, "Malformed login body");
            Json(LoginResponse {
                error: ErrorCode::ErrorJson,
                uid: 0,
                token: String::new(),
            })
        }
    }
}
