//! Publishes this chat server's online count to the shared counter store.

use std::sync::Arc;

use tracing::{debug, warn};

use super::registry::SessionRegistry;
use crate::domain::LoadStore;
use crate::infrastructure::metrics;

pub struct LoadReporter {
    server: String,
    store: Arc<dyn LoadStore>,
    registry: Arc<SessionRegistry>,
}

impl LoadReporter {
    pub fn new(
        server: impl Into<String>,
        store: Arc<dyn LoadStore>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            server: server.into(),
            store,
            registry,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Announce the server with a zero count so the directory starts
    /// routing to it.
    pub async fn start(&self) {
        if let Err(e) = self.store.set_server_load(&self.server, 0).await {
            warn!(server = %self.server, error = %e, "Failed to announce server load");
        }
        metrics::set_sessions_online(0);
    }

    /// Write the current online count. Store failures are logged; the next
    /// report overwrites the value anyway.
    pub async fn report(&self) {
        let count = self.registry.online_count();
        metrics::set_sessions_online(count);
        match self.store.set_server_load(&self.server, count as u32).await {
            Ok(()) => debug!(server = %self.server, count, "Reported server load"),
            Err(e) => warn!(server = %self.server, error = %e, "Failed to report server load"),
        }
    }

    /// Remove the counter so the directory stops routing here.
    pub async fn stop(&self) {
        if let Err(e) = self.store.clear_server_load(&self.server).await {
            warn!(server = %self.server, error = %e, "Failed to clear server load");
        }
        metrics::set_sessions_online(0);
    }
}
