//! Chat server descriptor and the shared load counter store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatServerEntry;
use crate::shared::error::AppError;

/// A chat server endpoint as known to the directory.
///
/// `load` is the logged-in session count read from the shared counter
/// store at selection time; the directory never changes it locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub load: Option<u32>,
}

impl ServerDescriptor {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            load: None,
        }
    }

    /// True for the placeholder returned when no servers are configured.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn with_load(mut self, load: Option<u32>) -> Self {
        self.load = load;
        self
    }
}

impl From<&ChatServerEntry> for ServerDescriptor {
    fn from(entry: &ChatServerEntry) -> Self {
        ServerDescriptor::new(entry.name.clone(), entry.host.clone(), entry.port)
    }
}

/// Shared per-server session counters.
///
/// Written by each chat server for its own name, read by the directory.
/// A server without a counter has never started (or shut down cleanly).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoadStore: Send + Sync {
    /// Current session count for a server, `None` if it never reported.
    async fn server_load(&self, server: &str) -> Result<Option<u32>, AppError>;

    /// Overwrite the session count for a server.
    async fn set_server_load(&self, server: &str, count: u32) -> Result<(), AppError>;

    /// Remove a server's counter entirely.
    async fn clear_server_load(&self, server: &str) -> Result<(), AppError>;
}
