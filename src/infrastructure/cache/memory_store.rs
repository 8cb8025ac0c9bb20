//! In-process `LoadStore` and `TokenStore` backed by `DashMap`.
//!
//! Behaves like the Redis layout within a single process; used by tests and
//! by single-process development setups.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::{LoadStore, TokenStore};
use crate::shared::error::AppError;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    loads: Arc<DashMap<String, u32>>,
    tokens: Arc<DashMap<i64, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoadStore for MemoryStore {
    async fn server_load(&self, server: &str) -> Result<Option<u32>, AppError> {
        Ok(self.loads.get(server).map(|v| *v))
    }

    async fn set_server_load(&self, server: &str, count: u32) -> Result<(), AppError> {
        self.loads.insert(server.to_string(), count);
        Ok(())
    }

    async fn clear_server_load(&self, server: &str) -> Result<(), AppError> {
        self.loads.remove(server);
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn put_token(&self, uid: i64, token: &str) -> Result<(), AppError> {
        self.tokens.insert(uid, token.to_string());
        Ok(())
    }

    async fn get_token(&self, uid: i64) -> Result<Option<String>, AppError> {
        Ok(self.tokens.get(&uid).map(|t| t.clone()))
    }
}
