//! Common Test Utilities
//!
//! In-process fixtures for the three services: routers driven with
//! `oneshot`, an in-memory user table, and a framed TCP chat client.

#![allow(dead_code)]

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tower::ServiceExt;

use chat_backend::application::services::{DirectoryService, GatewayService};
use chat_backend::domain::{LoadStore, ServerDescriptor, TokenStore, UserCredentials, UserRepository};
use chat_backend::infrastructure::cache::MemoryStore;
use chat_backend::presentation::http::{
    create_directory_router, create_gateway_router, DirectoryState, GatewayState, PoolSet,
};
use chat_backend::presentation::tcp::{Frame, FrameCodec};
use chat_backend::shared::AppError;

/// Test application wrapping one router
pub struct TestApp {
    pub router: Router,
}

impl TestApp {
    /// Directory router over an in-memory store
    pub fn directory(directory: Arc<DirectoryService>) -> Self {
        Self {
            router: create_directory_router(DirectoryState {
                directory,
                pools: PoolSet::default(),
            }),
        }
    }

    /// Gateway router over in-memory users and an in-process directory
    pub fn gateway(users: FakeUsers, directory: Arc<DirectoryService>) -> Self {
        let gateway = GatewayService::new(Arc::new(users), directory);
        Self {
            router: create_gateway_router(GatewayState {
                gateway: Arc::new(gateway),
                pools: PoolSet::default(),
            }),
        }
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

/// Read a response body as JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Directory service over `store` with the given `(name, port)` servers on
/// localhost
pub fn directory_over(store: &MemoryStore, servers: &[(&str, u16)]) -> Arc<DirectoryService> {
    let servers = servers
        .iter()
        .map(|(name, port)| ServerDescriptor::new(*name, "127.0.0.1", *port))
        .collect();
    Arc::new(DirectoryService::new(
        servers,
        Arc::new(store.clone()) as Arc<dyn LoadStore>,
        Arc::new(store.clone()) as Arc<dyn TokenStore>,
    ))
}

/// Test user credentials for login tests
pub struct TestUser {
    pub uid: i64,
    pub name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
}

pub const TEST_USER: TestUser = TestUser {
    uid: 1001,
    name: "testuser",
    email: "test@example.com",
    password: "TestPassword123!",
};

/// In-memory `users` table keyed by email
#[derive(Default)]
pub struct FakeUsers {
    rows: DashMap<String, UserCredentials>,
}

impl FakeUsers {
    pub fn with(user: &TestUser) -> Self {
        let users = Self::default();
        let salt = SaltString::encode_b64(b"integration-salt").unwrap();
        let hash = Argon2::default()
            .hash_password(user.password.as_bytes(), &salt)
            .unwrap()
            .to_string();
        users.rows.insert(
            user.email.to_string(),
            UserCredentials {
                uid: user.uid,
                name: user.name.to_string(),
                email: user.email.to_string(),
                password_hash: hash,
            },
        );
        users
    }
}

#[async_trait]
impl UserRepository for FakeUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        Ok(self.rows.get(email).map(|row| row.clone()))
    }
}

/// Framed chat client
pub struct ChatClient {
    inner: Framed<TcpStream, FrameCodec>,
}

impl ChatClient {
    pub async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            inner: Framed::new(stream, FrameCodec::new(2048)),
        }
    }

    pub async fn send<T: Serialize>(&mut self, id: u16, body: &T) {
        self.inner.send(Frame::json(id, body).unwrap()).await.unwrap();
    }

    /// Next frame, failing the test after two seconds of silence
    pub async fn recv(&mut self) -> Frame {
        tokio::time::timeout(std::time::Duration::from_secs(2), self.inner.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap()
    }

    /// Next frame, asserting its message id and parsing the body
    pub async fn expect<T: DeserializeOwned>(&mut self, id: u16) -> T {
        let frame = self.recv().await;
        assert_eq!(frame.id, id, "unexpected message id");
        frame.parse().unwrap()
    }

    /// True once the server has closed the connection
    pub async fn closed(&mut self) -> bool {
        matches!(
            tokio::time::timeout(std::time::Duration::from_secs(2), self.inner.next()).await,
            Ok(None) | Ok(Some(Err(_)))
        )
    }
}

/// Generate a unique test email
pub fn unique_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4())
}
