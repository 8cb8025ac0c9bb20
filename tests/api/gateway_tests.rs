//! Gateway Login Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use chat_backend::domain::{LoadStore, TokenStore};
use chat_backend::infrastructure::cache::MemoryStore;

use crate::common::{body_json, directory_over, unique_email, FakeUsers, TestApp, TEST_USER};

fn login_body(email: &str, passwd: &str) -> String {
    serde_json::json!({ "email": email, "passwd": passwd }).to_string()
}

#[tokio::test]
async fn test_login_hands_off_to_chat_server() {
    let store = MemoryStore::new();
    store.set_server_load("chatserver1", 3).await.unwrap();
    store.set_server_load("chatserver2", 1).await.unwrap();
    let app = TestApp::gateway(
        FakeUsers::with(&TEST_USER),
        directory_over(&store, &[("chatserver1", 8090), ("chatserver2", 8091)]),
    );

    let response = app
        .post_json("/user_login", &login_body(TEST_USER.email, TEST_USER.password))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["error"], 0);
    assert_eq!(body["email"], TEST_USER.email);
    assert_eq!(body["uid"], TEST_USER.uid);
    assert_eq!(body["host"], "127.0.0.1");
    assert_eq!(body["port"], 8091);
    assert_eq!(
        store.get_token(TEST_USER.uid).await.unwrap().as_deref(),
        body["token"].as_str()
    );
}

#[tokio::test]
async fn test_wrong_password() {
    let store = MemoryStore::new();
    let app = TestApp::gateway(
        FakeUsers::with(&TEST_USER),
        directory_over(&store, &[("chatserver1", 8090)]),
    );

    let body = body_json(
        app.post_json("/user_login", &login_body(TEST_USER.email, "nope"))
            .await,
    )
    .await;
    assert_eq!(body["error"], 1009);
    assert_eq!(body["token"], "");
    assert_eq!(store.get_token(TEST_USER.uid).await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_email() {
    let store = MemoryStore::new();
    let app = TestApp::gateway(
        FakeUsers::with(&TEST_USER),
        directory_over(&store, &[("chatserver1", 8090)]),
    );

    let email = unique_email();
    let body = body_json(
        app.post_json("/user_login", &login_body(&email, TEST_USER.password))
            .await,
    )
    .await;
    assert_eq!(body["error"], 1009);
    assert_eq!(body["email"], email);
}

#[tokio::test]
async fn test_directory_failure_reports_rpc_failed() {
    let store = MemoryStore::new();
    let app = TestApp::gateway(FakeUsers::with(&TEST_USER), directory_over(&store, &[]));

    let body = body_json(
        app.post_json("/user_login", &login_body(TEST_USER.email, TEST_USER.password))
            .await,
    )
    .await;
    assert_eq!(body["error"], 1002);
}

#[tokio::test]
async fn test_malformed_body_reports_error_json() {
    let store = MemoryStore::new();
    let app = TestApp::gateway(
        FakeUsers::with(&TEST_USER),
        directory_over(&store, &[("chatserver1", 8090)]),
    );

    let response = app.post_json("/user_login", "{not json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["error"], 1001);

    let body = body_json(
        app.post_json("/user_login", &login_body("not-an-email", "x"))
            .await,
    )
    .await;
    assert_eq!(body["error"], 1001);
}
