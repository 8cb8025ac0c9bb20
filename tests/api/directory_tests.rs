//! Directory RPC Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use chat_backend::domain::{LoadStore, TokenStore};
use chat_backend::infrastructure::cache::MemoryStore;

use crate::common::{body_json, directory_over, TestApp};

#[tokio::test]
async fn test_get_chat_server_picks_least_loaded() {
    let store = MemoryStore::new();
    store.set_server_load("chatserver1", 5).await.unwrap();
    store.set_server_load("chatserver2", 2).await.unwrap();
    store.set_server_load("chatserver3", 2).await.unwrap();
    let app = TestApp::directory(directory_over(
        &store,
        &[("chatserver1", 8090), ("chatserver2", 8091), ("chatserver3", 8092)],
    ));

    let response = app.post_json("/rpc/get_chat_server", r#"{"uid":7}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["error"], 0);
    assert_eq!(body["host"], "127.0.0.1");
    assert_eq!(body["port"], 8091);

    let token = body["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert_eq!(store.get_token(7).await.unwrap(), Some(token));
}

#[tokio::test]
async fn test_get_chat_server_without_servers_fails() {
    let store = MemoryStore::new();
    let app = TestApp::directory(directory_over(&store, &[]));

    let body = body_json(app.post_json("/rpc/get_chat_server", r#"{"uid":7}"#).await).await;
    assert_eq!(body["error"], 1002);
    assert_eq!(store.get_token(7).await.unwrap(), None);
}

#[tokio::test]
async fn test_issued_token_validates_once_replaced() {
    let store = MemoryStore::new();
    let app = TestApp::directory(directory_over(&store, &[("chatserver1", 8090)]));

    let first = body_json(app.post_json("/rpc/get_chat_server", r#"{"uid":9}"#).await).await;
    let first_token = first["token"].as_str().unwrap().to_string();

    let login = format!(r#"{{"uid":9,"token":"{}"}}"#, first_token);
    let body = body_json(app.post_json("/rpc/login", &login).await).await;
    assert_eq!(body["error"], 0);
    assert_eq!(body["uid"], 9);

    // A second handoff replaces the stored token.
    app.post_json("/rpc/get_chat_server", r#"{"uid":9}"#).await;
    let body = body_json(app.post_json("/rpc/login", &login).await).await;
    assert_eq!(body["error"], 1010);
}

#[tokio::test]
async fn test_login_for_unknown_uid() {
    let store = MemoryStore::new();
    let app = TestApp::directory(directory_over(&store, &[("chatserver1", 8090)]));

    let body = body_json(
        app.post_json("/rpc/login", r#"{"uid":404,"token":"anything"}"#)
            .await,
    )
    .await;
    assert_eq!(body["error"], 1011);
}

#[tokio::test]
async fn test_malformed_rpc_body_answers_error_json() {
    let store = MemoryStore::new();
    let app = TestApp::directory(directory_over(&store, &[("chatserver1", 8090)]));

    let response = app.post_json("/rpc/get_chat_server", r#"{"uid":"x"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"], 1001);
    assert_eq!(body["token"], "");

    let response = app.post_json("/rpc/login", "not json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"], 1001);
    assert_eq!(body["uid"], 0);
}
