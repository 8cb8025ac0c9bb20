//! Cache Module
//!
//! Redis connection management and the shared stores built on it.
//!
//! This module provides:
//! - A [`RedisConnector`] so Redis connections live in the shared resource pool
//! - [`RedisStore`], the production `LoadStore` and `TokenStore`
//! - [`MemoryStore`], an in-process implementation of the same traits
//! - Predefined key names for consistent cache key naming
//!
//! # Architecture
//!
//! ```text
//! +-----------------------+
//! | DirectoryService /    |
//! | LoadReporter          |
//! +-----------------------+
//!          |
//!          v
//! +-----------------------+
//! | LoadStore/TokenStore  |  <-- Domain traits
//! +-----------------------+
//!          |
//!          v
//! +-----------------------+
//! |      RedisStore       |  <-- Concrete implementation
//! +-----------------------+
//!          |
//!          v
//! +-----------------------+
//! | ResourcePool<Redis..> |  <-- Pooled multiplexed connections
//! +-----------------------+
//! ```

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::{RedisConnector, RedisResourcePool, RedisStore};

use tracing::{info, instrument};

use crate::config::{PoolSettings, RedisSettings};
use crate::infrastructure::pool::{PoolConfig, PoolError, ResourcePool};

/// Creates the Redis resource pool.
///
/// Fails only when the URL itself is malformed; unreachable servers are
/// retried by the pool's health checker.
#[instrument(skip_all, fields(url = %settings.url, size = settings.pool_size))]
pub async fn create_redis_pool(
    settings: &RedisSettings,
    pool: &PoolSettings,
) -> Result<RedisResourcePool, PoolError> {
    info!("Connecting to Redis...");
    let connector = RedisConnector::new(&settings.url)?;
    let pool = ResourcePool::new(connector, PoolConfig::from_settings(settings.pool_size, pool)).await;
    info!(idle = pool.status().idle, "Redis pool ready");
    Ok(pool)
}

/// Key names shared by every service that touches the counter and token
/// stores.
///
/// # Example
/// ```rust,ignore
/// use chat_backend::infrastructure::cache::keys;
///
/// let token_key = keys::token(42); // "utoken_42"
/// ```
pub mod keys {
    /// Hash holding the session count per chat server, field = server name
    pub const LOGIN_COUNT: &str = "logincount";

    /// Prefix for the current login token of a user (e.g., "utoken_42")
    pub const USER_TOKEN: &str = "utoken_";

    /// Generates the token key for a user
    #[inline]
    pub fn token(uid: impl std::fmt::Display) -> String {
        format!("{}{}", USER_TOKEN, uid)
    }
}
