//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - The generic health-checked resource pool
//! - Database repositories (PostgreSQL)
//! - Shared counter and token stores (Redis)
//! - The directory RPC client
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod metrics;
pub mod pool;
pub mod repositories;
pub mod rpc;
