//! Directory Service
//!
//! Routes users onto chat servers and brokers the login token handoff.
//!
//! Load is never tracked locally: every selection reads the shared counter
//! store, which each chat server keeps current for its own name.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use super::DirectoryApi;
use crate::application::dto::{GetChatServerResponse, LoginResponse};
use crate::domain::{generate_token, LoadStore, ServerDescriptor, TokenStore};
use crate::shared::error::{AppError, ErrorCode};

pub struct DirectoryService {
    servers: Vec<ServerDescriptor>,
    loads: Arc<dyn LoadStore>,
    tokens: Arc<dyn TokenStore>,
}

impl DirectoryService {
    pub fn new(
        servers: Vec<ServerDescriptor>,
        loads: Arc<dyn LoadStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            servers,
            loads,
            tokens,
        }
    }

    /// Configured chat servers, in configuration order.
    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    /// Least-loaded server among those that have reported a counter.
    ///
    /// Ties go to the server configured first. When no server has reported,
    /// the first configured server is returned; with none configured, the
    /// empty descriptor.
    #[instrument(skip(self))]
    pub async fn select_server(&self) -> ServerDescriptor {
        let mut best: Option<(u32, &ServerDescriptor)> = None;

        for server in &self.servers {
            let load = match self.loads.server_load(&server.name).await {
                Ok(Some(load)) => load,
                Ok(None) => {
                    debug!(server = %server.name, "Server has not reported a load, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(server = %server.name, error = %e, "Failed to read server load, skipping");
                    continue;
                }
            };

            if best.map_or(true, |(min, _)| load < min) {
                best = Some((load, server));
            }
        }

        match best {
            Some((load, server)) => server.clone().with_load(Some(load)),
            None => {
                let fallback = self.servers.first().cloned().unwrap_or_default();
                if !fallback.is_empty() {
                    warn!(server = %fallback.name, "No server has reported a load, using first configured");
                }
                fallback
            }
        }
    }

    /// Mint a fresh token for `uid`, replacing any previous one.
    #[instrument(skip(self))]
    pub async fn issue_token(&self, uid: i64) -> Result<String, AppError> {
        let token = generate_token();
        self.tokens.put_token(uid, &token).await?;
        debug!("Issued login token");
        Ok(token)
    }

    /// Check `token` against the one currently stored for `uid`.
    #[instrument(skip(self, token))]
    pub async fn validate_login(&self, uid: i64, token: &str) -> Result<(), ErrorCode> {
        let stored = self.tokens.get_token(uid).await.map_err(|e| {
            error!(error = %e, "Token store lookup failed");
            ErrorCode::RpcFailed
        })?;

        match stored {
            None => Err(ErrorCode::UidInvalid),
            Some(stored) if stored != token => Err(ErrorCode::TokenInvalid),
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryApi for DirectoryService {
    async fn get_chat_server(&self, uid: i64) -> GetChatServerResponse {
        let server = self.select_server().await;
        if server.is_empty() {
            warn!(uid, "No chat servers configured");
            return GetChatServerResponse::failed(ErrorCode::RpcFailed);
        }

        match self.issue_token(uid).await {
            Ok(token) => {
                info!(uid, server = %server.name, load = ?server.load, "Assigned chat server");
                GetChatServerResponse {
                    error: ErrorCode::Success,
                    host: server.host,
                    port: server.port,
                    token,
                }
            }
            Err(e) => {
                error!(uid, error = %e, "Failed to store login token");
                GetChatServerResponse::failed(ErrorCode::RpcFailed)
            }
        }
    }

    async fn login(&self, uid: i64, token: &str) -> LoginResponse {
        let error = match self.validate_login(uid, token).await {
            Ok(()) => ErrorCode::Success,
            Err(code) => code,
        };
        LoginResponse {
            error,
            uid,
            token: token.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockLoadStore, MockTokenStore};
    use crate::infrastructure::cache::MemoryStore;
    use pretty_assertions::assert_eq;

    fn servers(names: &[&str]) -> Vec<ServerDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| ServerDescriptor::new(*name, "127.0.0.1", 8090 + i as u16))
            .collect()
    }

    fn service(names: &[&str], store: &MemoryStore) -> DirectoryService {
        DirectoryService::new(
            servers(names),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_select_least_loaded_first_tie_wins() {
        let store = MemoryStore::new();
        store.set_server_load("A", 5).await.unwrap();
        store.set_server_load("B", 2).await.unwrap();
        store.set_server_load("C", 2).await.unwrap();

        let selected = service(&["A", "B", "C"], &store).select_server().await;

        assert_eq!(selected.name, "B");
        assert_eq!(selected.load, Some(2));
    }

    #[tokio::test]
    async fn test_unstarted_servers_are_excluded() {
        let store = MemoryStore::new();
        store.set_server_load("B", 9).await.unwrap();

        let selected = service(&["A", "B"], &store).select_server().await;

        assert_eq!(selected.name, "B");
    }

    #[tokio::test]
    async fn test_falls_back_to_first_when_none_reported() {
        let store = MemoryStore::new();
        let selected = service(&["A", "B"], &store).select_server().await;
        assert_eq!(selected.name, "A");
        assert_eq!(selected.load, None);
    }

    #[tokio::test]
    async fn test_no_servers_yields_empty_descriptor() {
        let store = MemoryStore::new();
        let directory = service(&[], &store);

        assert!(directory.select_server().await.is_empty());
        assert_eq!(
            directory.get_chat_server(1).await,
            GetChatServerResponse::failed(ErrorCode::RpcFailed)
        );
    }

    #[tokio::test]
    async fn test_load_read_error_treats_server_as_unstarted() {
        let mut loads = MockLoadStore::new();
        loads.expect_server_load().returning(|name| {
            if name == "A" {
                Err(AppError::Unavailable("redis down".into()))
            } else {
                Ok(Some(4))
            }
        });
        let directory = DirectoryService::new(
            servers(&["A", "B"]),
            Arc::new(loads),
            Arc::new(MemoryStore::new()),
        );

        assert_eq!(directory.select_server().await.name, "B");
    }

    #[tokio::test]
    async fn test_token_handoff() {
        let store = MemoryStore::new();
        let directory = service(&["A"], &store);

        let token = directory.issue_token(7).await.unwrap();
        assert_eq!(directory.validate_login(7, &token).await, Ok(()));
        assert_eq!(
            directory.validate_login(7, "wrong").await,
            Err(ErrorCode::TokenInvalid)
        );
        assert_eq!(
            directory.validate_login(8, &token).await,
            Err(ErrorCode::UidInvalid)
        );
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_token() {
        let store = MemoryStore::new();
        let directory = service(&["A"], &store);

        let first = directory.issue_token(7).await.unwrap();
        let second = directory.issue_token(7).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(
            directory.validate_login(7, &first).await,
            Err(ErrorCode::TokenInvalid)
        );
        assert_eq!(directory.validate_login(7, &second).await, Ok(()));
    }

    #[tokio::test]
    async fn test_get_chat_server_returns_endpoint_and_valid_token() {
        let store = MemoryStore::new();
        store.set_server_load("A", 3).await.unwrap();
        store.set_server_load("B", 1).await.unwrap();
        let directory = service(&["A", "B"], &store);

        let reply = directory.get_chat_server(42).await;
        assert_eq!(reply.error, ErrorCode::Success);
        assert_eq!(reply.port, 8091);

        let login = directory.login(42, &reply.token).await;
        assert_eq!(login.error, ErrorCode::Success);
        assert_eq!(login.uid, 42);
    }

    #[tokio::test]
    async fn test_token_store_failure_reports_rpc_failed() {
        let mut tokens = MockTokenStore::new();
        tokens
            .expect_get_token()
            .returning(|_| Err(AppError::Unavailable("redis pool is closed".into())));
        let directory = DirectoryService::new(
            servers(&["A"]),
            Arc::new(MemoryStore::new()),
            Arc::new(tokens),
        );

        let reply = directory.login(1, "t").await;
        assert_eq!(reply.error, ErrorCode::RpcFailed);
    }
}
