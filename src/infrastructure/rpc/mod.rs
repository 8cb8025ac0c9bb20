//! Directory RPC Client
//!
//! Pooled HTTP stubs for calling the directory service from the gateway and
//! from chat servers.
//!
//! Each stub carries its own `reqwest::Client` and the directory base URL.
//! A stub is probed with `GET /health/live`; transport failures are reported
//! to callers as `ErrorCode::RpcFailed` in the reply body.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, instrument, warn};

use crate::application::dto::{
    GetChatServerRequest, GetChatServerResponse, LoginRequest, LoginResponse,
};
use crate::application::services::DirectoryApi;
use crate::config::{DirectorySettings, PoolSettings};
use crate::infrastructure::pool::{Connector, PoolConfig, PoolError, ResourcePool};
use crate::shared::error::ErrorCode;

/// Directory RPC paths, shared with the directory's router.
pub mod paths {
    pub const GET_CHAT_SERVER: &str = "/rpc/get_chat_server";
    pub const LOGIN: &str = "/rpc/login";
    pub const LIVENESS: &str = "/health/live";
}

/// One client stub bound to the directory endpoint.
#[derive(Debug, Clone)]
pub struct DirectoryStub {
    client: reqwest::Client,
    base_url: String,
}

impl DirectoryStub {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, reqwest::Error>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<Resp>()
            .await
    }
}

/// Creates directory stubs for the pool.
#[derive(Debug, Clone)]
pub struct DirectoryStubConnector {
    base_url: String,
    timeout: std::time::Duration,
}

impl DirectoryStubConnector {
    pub fn new(settings: &DirectorySettings) -> Self {
        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            timeout: settings.request_timeout(),
        }
    }
}

#[async_trait]
impl Connector for DirectoryStubConnector {
    type Connection = DirectoryStub;

    fn name(&self) -> &str {
        "directory"
    }

    async fn connect(&self) -> Result<DirectoryStub, PoolError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| PoolError::Connect(e.to_string()))?;
        Ok(DirectoryStub {
            client,
            base_url: self.base_url.clone(),
        })
    }

    async fn probe(&self, stub: &mut DirectoryStub) -> Result<(), PoolError> {
        stub.client
            .get(stub.url(paths::LIVENESS))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map(|_| ())
            .map_err(|e| PoolError::Probe(e.to_string()))
    }
}

pub type DirectoryResourcePool = ResourcePool<DirectoryStubConnector>;

/// Create the directory stub pool.
pub async fn create_directory_pool(
    settings: &DirectorySettings,
    pool: &PoolSettings,
) -> DirectoryResourcePool {
    ResourcePool::new(
        DirectoryStubConnector::new(settings),
        PoolConfig::from_settings(settings.pool_size, pool),
    )
    .await
}

/// `DirectoryApi` over the pooled HTTP stubs.
#[derive(Clone)]
pub struct DirectoryClient {
    pool: DirectoryResourcePool,
}

impl DirectoryClient {
    pub fn new(pool: DirectoryResourcePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DirectoryResourcePool {
        &self.pool
    }

    async fn invoke<Req, Resp>(&self, path: &str, body: &Req) -> Option<Resp>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let Some(stub) = self.pool.acquire().await else {
            warn!(path, "Directory stub pool is closed");
            return None;
        };

        match stub.call(path, body).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                error!(path, error = %e, "Directory call failed");
                None
            }
        }
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    #[instrument(skip(self))]
    async fn get_chat_server(&self, uid: i64) -> GetChatServerResponse {
        self.invoke(paths::GET_CHAT_SERVER, &GetChatServerRequest { uid })
            .await
            .unwrap_or_else(|| GetChatServerResponse::failed(ErrorCode::RpcFailed))
    }

    #[instrument(skip(self, token))]
    async fn login(&self, uid: i64, token: &str) -> LoginResponse {
        let request = LoginRequest {
            uid,
            token: token.to_string(),
        };
        self.invoke(paths::LOGIN, &request)
            .await
            .unwrap_or_else(|| LoginResponse {
                error: ErrorCode::RpcFailed,
                uid,
                token: request.token.clone(),
            })
    }
}
