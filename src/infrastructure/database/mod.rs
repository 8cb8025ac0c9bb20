//! Database Module
//!
//! PostgreSQL connections held in the shared [`ResourcePool`].
//!
//! Each pooled resource is a single `PgConnection` opened with the configured
//! URL. The liveness probe is the driver's `ping`.

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use tracing::{debug, instrument};

use crate::config::{DatabaseSettings, PoolSettings};
use crate::infrastructure::pool::{Connector, PoolConfig, PoolError, ResourcePool};

/// Opens PostgreSQL connections for the pool.
#[derive(Debug, Clone)]
pub struct PgConnector {
    url: String,
}

impl PgConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgConnection;

    fn name(&self) -> &str {
        "postgres"
    }

    async fn connect(&self) -> Result<PgConnection, PoolError> {
        PgConnection::connect(&self.url)
            .await
            .map_err(|e| PoolError::Connect(e.to_string()))
    }

    async fn probe(&self, conn: &mut PgConnection) -> Result<(), PoolError> {
        conn.ping()
            .await
            .map_err(|e| PoolError::Probe(e.to_string()))
    }
}

/// Shared PostgreSQL pool type.
pub type PgResourcePool = ResourcePool<PgConnector>;

/// Create the PostgreSQL resource pool.
///
/// Connections that fail to open here are retried by the first health-check
/// cycle, so startup does not fail when the database is briefly unreachable.
#[instrument(skip_all, fields(size = settings.pool_size))]
pub async fn create_pool(settings: &DatabaseSettings, pool: &PoolSettings) -> PgResourcePool {
    debug!("Opening PostgreSQL connections");
    ResourcePool::new(
        PgConnector::new(settings.url.clone()),
        PoolConfig::from_settings(settings.pool_size, pool),
    )
    .await
}

/// True when the error means the connection itself is unusable.
pub(crate) fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) | sqlx::Error::PoolClosed
    )
}
