//! Health Check API Tests

use axum::http::StatusCode;

use chat_backend::infrastructure::cache::MemoryStore;

use crate::common::{body_json, directory_over, TestApp};

fn app() -> TestApp {
    TestApp::directory(directory_over(&MemoryStore::new(), &[("chatserver1", 8090)]))
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let response = app().get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_liveness_probe() {
    let response = app().get("/health/live").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "alive");
}

#[tokio::test]
async fn test_readiness_without_pools_is_healthy() {
    let response = app().get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["pools"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint_counts_requests() {
    let app = app();
    app.get("/health").await;

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("/health"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = app().get("/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
