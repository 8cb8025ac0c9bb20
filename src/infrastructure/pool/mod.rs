//! Resource Pool Module
//!
//! One bounded, health-checked pool shared by every backing resource the
//! services hold open: PostgreSQL connections, Redis connections, and
//! directory RPC stubs.
//!
//! # Architecture
//!
//! ```text
//! +--------------------+      acquire()/drop       +------------------+
//! |  Repository/Store  | ------------------------> |  ResourcePool<C> |
//! +--------------------+                           +------------------+
//!                                                     |   idle queue
//!                                  health_check() ----+   failure count
//!                                  reconnect()        |
//!                                                     v
//!                                               +-----------+
//!                                               | Connector |  connect()/probe()
//!                                               +-----------+
//! ```

mod resource_pool;

pub use resource_pool::{
    Connector, HealthReport, ManagedPool, PoolConfig, PoolStatus, PooledConnection, ResourcePool,
};

/// Errors raised while creating or probing a pooled resource.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("liveness probe failed: {0}")]
    Probe(String),
}
