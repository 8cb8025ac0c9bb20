//! Redis Store
//!
//! Redis-backed `LoadStore` and `TokenStore`.
//!
//! - Server loads live in the `logincount` hash, one field per server name
//! - Tokens live in plain string keys `utoken_<uid>`, overwritten on reissue

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use tracing::{debug, instrument, warn};

use super::keys;
use crate::domain::{LoadStore, TokenStore};
use crate::infrastructure::pool::{Connector, PoolError, PooledConnection, ResourcePool};
use crate::shared::error::AppError;

/// Opens multiplexed Redis connections for the pool.
#[derive(Debug, Clone)]
pub struct RedisConnector {
    client: Client,
}

impl RedisConnector {
    pub fn new(url: &str) -> Result<Self, PoolError> {
        let client = Client::open(url).map_err(|e| PoolError::Connect(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Connector for RedisConnector {
    type Connection = MultiplexedConnection;

    fn name(&self) -> &str {
        "redis"
    }

    async fn connect(&self) -> Result<MultiplexedConnection, PoolError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PoolError::Connect(e.to_string()))
    }

    async fn probe(&self, conn: &mut MultiplexedConnection) -> Result<(), PoolError> {
        let _: String = redis::cmd("PING")
            .query_async(conn)
            .await
            .map_err(|e| PoolError::Probe(e.to_string()))?;
        Ok(())
    }
}

/// Shared Redis pool type.
pub type RedisResourcePool = ResourcePool<RedisConnector>;

type RedisConn = PooledConnection<RedisConnector>;

/// Redis implementation of the shared counter and token stores.
#[derive(Clone)]
pub struct RedisStore {
    pool: RedisResourcePool,
}

impl RedisStore {
    pub fn new(pool: RedisResourcePool) -> Self {
        Self { pool }
    }

    async fn checkout(&self) -> Result<RedisConn, AppError> {
        self.pool
            .acquire()
            .await
            .ok_or_else(|| AppError::pool_closed(self.pool.name()))
    }

    /// Hand the connection back, or drop it if the error says it is dead.
    fn fail(conn: RedisConn, err: RedisError) -> AppError {
        if err.is_io_error() || err.is_connection_dropped() {
            warn!(error = %err, "Dropping broken Redis connection");
            conn.invalidate();
        }
        AppError::Redis(err)
    }
}

#[async_trait]
impl LoadStore for RedisStore {
    #[instrument(skip(self))]
    async fn server_load(&self, server: &str) -> Result<Option<u32>, AppError> {
        let mut conn = self.checkout().await?;
        let c: &mut MultiplexedConnection = &mut conn;
        let result = c.hget::<_, _, Option<u32>>(keys::LOGIN_COUNT, server).await;
        match result {
            Ok(load) => {
                debug!(?load, "Read server load");
                Ok(load)
            }
            Err(e) => Err(Self::fail(conn, e)),
        }
    }

    #[instrument(skip(self))]
    async fn set_server_load(&self, server: &str, count: u32) -> Result<(), AppError> {
        let mut conn = self.checkout().await?;
        let c: &mut MultiplexedConnection = &mut conn;
        let result = c.hset::<_, _, _, ()>(keys::LOGIN_COUNT, server, count).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(Self::fail(conn, e)),
        }
    }

    #[instrument(skip(self))]
    async fn clear_server_load(&self, server: &str) -> Result<(), AppError> {
        let mut conn = self.checkout().await?;
        let c: &mut MultiplexedConnection = &mut conn;
        let result = c.hdel::<_, _, ()>(keys::LOGIN_COUNT, server).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(Self::fail(conn, e)),
        }
    }
}

#[async_trait]
impl TokenStore for RedisStore {
    #[instrument(skip(self, token))]
    async fn put_token(&self, uid: i64, token: &str) -> Result<(), AppError> {
        let mut conn = self.checkout().await?;
        let c: &mut MultiplexedConnection = &mut conn;
        let result = c.set::<_, _, ()>(keys::token(uid), token).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(Self::fail(conn, e)),
        }
    }

    #[instrument(skip(self))]
    async fn get_token(&self, uid: i64) -> Result<Option<String>, AppError> {
        let mut conn = self.checkout().await?;
        let c: &mut MultiplexedConnection = &mut conn;
        let result = c.get::<_, Option<String>>(keys::token(uid)).await;
        match result {
            Ok(token) => Ok(token),
            Err(e) => Err(Self::fail(conn, e)),
        }
    }
}
