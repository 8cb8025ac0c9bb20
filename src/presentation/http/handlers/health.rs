//! Health Check Handlers
//!
//! Provides health check endpoints for Kubernetes-style liveness and readiness probes.
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness probe (is the server running?)
//! - `GET /health/ready` - Readiness probe (are the backing pools usable?)
//!
//! The readiness probe runs a health-check pass on every pool before
//! reporting, so stale resources are probed on demand rather than waiting for
//! the next background cycle.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

use crate::infrastructure::pool::PoolStatus;
use crate::presentation::http::state::PoolSet;

/// Server start time for uptime calculation
static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Initialize the server start time (call during startup)
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

/// Basic health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health check response
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub pools: Vec<PoolHealth>,
}

/// Health of one resource pool
#[derive(Debug, Serialize)]
pub struct PoolHealth {
    pub name: String,
    pub status: HealthStatus,
    pub capacity: usize,
    pub idle: usize,
    pub checked_out: usize,
    pub pending_failures: usize,
    pub probe_failures: usize,
}

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Simple liveness response
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness probe. Also used by pooled directory stubs as their probe.
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Readiness probe - returns 503 when any pool has nothing usable left
pub async fn readiness(State(pools): State<PoolSet>) -> impl IntoResponse {
    let mut checks = Vec::new();
    for pool in pools.iter() {
        let report = pool.check().await;
        checks.push(pool_health(pool.name(), &pool.status(), report.failed));
    }

    let overall_status = determine_overall_status(&checks);
    let response = DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        started_at: SERVER_START_TIME.to_rfc3339(),
        pools: checks,
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

fn pool_health(name: &str, status: &PoolStatus, probe_failures: usize) -> PoolHealth {
    let health = if status.stopped || status.idle + status.checked_out == 0 {
        HealthStatus::Unhealthy
    } else if status.pending_failures > 0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    PoolHealth {
        name: name.to_string(),
        status: health,
        capacity: status.capacity,
        idle: status.idle,
        checked_out: status.checked_out,
        pending_failures: status.pending_failures,
        probe_failures,
    }
}

/// Worst status among the pools
fn determine_overall_status(pools: &[PoolHealth]) -> HealthStatus {
    if pools.iter().any(|p| p.status == HealthStatus::Unhealthy) {
        return HealthStatus::Unhealthy;
    }
    if pools.iter().any(|p| p.status == HealthStatus::Degraded) {
        return HealthStatus::Degraded;
    }
    HealthStatus::Healthy
}
