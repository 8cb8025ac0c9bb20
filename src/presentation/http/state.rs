//! Router State
//!
//! Shared handles injected into the gateway and directory routers.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::application::services::{DirectoryService, GatewayService};
use crate::infrastructure::pool::ManagedPool;

/// Pools whose health the readiness probe reports.
#[derive(Clone, Default)]
pub struct PoolSet {
    pools: Arc<Vec<Arc<dyn ManagedPool>>>,
}

impl PoolSet {
    pub fn new(pools: Vec<Arc<dyn ManagedPool>>) -> Self {
        Self {
            pools: Arc::new(pools),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ManagedPool>> {
        self.pools.iter()
    }

    /// Close every pool.
    pub fn close_all(&self) {
        for pool in self.iter() {
            pool.close();
        }
    }
}

/// State of the gateway role
#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<GatewayService>,
    pub pools: PoolSet,
}

/// State of the directory role
#[derive(Clone)]
pub struct DirectoryState {
    pub directory: Arc<DirectoryService>,
    pub pools: PoolSet,
}

impl FromRef<GatewayState> for PoolSet {
    fn from_ref(state: &GatewayState) -> Self {
        state.pools.clone()
    }
}

impl FromRef<DirectoryState> for PoolSet {
    fn from_ref(state: &DirectoryState) -> Self {
        state.pools.clone()
    }
}
