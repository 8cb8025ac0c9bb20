//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - Online chat sessions and frame throughput
//! - Protocol violations per reason
//! - Resource pool occupancy and failed liveness probes

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace("chat_backend"),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// Authenticated sessions registered on this chat server
pub static SESSIONS_ONLINE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("sessions_online", "Authenticated chat sessions").namespace("chat_backend"),
    )
    .expect("Failed to create SESSIONS_ONLINE metric")
});

/// Frames moved over chat sessions, by direction
pub static FRAMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("frames_total", "Chat protocol frames").namespace("chat_backend"),
        &["direction"], // "in", "out", "dropped"
    )
    .expect("Failed to create FRAMES_TOTAL metric")
});

/// Sessions closed for breaking the wire protocol or going silent
pub static SESSION_CLOSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("session_closes_total", "Chat sessions closed, by reason")
            .namespace("chat_backend"),
        &["reason"],
    )
    .expect("Failed to create SESSION_CLOSES_TOTAL metric")
});

/// Resource pool occupancy
pub static POOL_RESOURCES: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("pool_resources", "Resource pool occupancy").namespace("chat_backend"),
        &["pool", "state"], // "idle", "checked_out"
    )
    .expect("Failed to create POOL_RESOURCES metric")
});

/// Failed liveness probes per pool
pub static POOL_PROBE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pool_probe_failures_total", "Failed pooled resource probes")
            .namespace("chat_backend"),
        &["pool"],
    )
    .expect("Failed to create POOL_PROBE_FAILURES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(SESSIONS_ONLINE.clone()))
        .expect("Failed to register SESSIONS_ONLINE");
    registry
        .register(Box::new(FRAMES_TOTAL.clone()))
        .expect("Failed to register FRAMES_TOTAL");
    registry
        .register(Box::new(SESSION_CLOSES_TOTAL.clone()))
        .expect("Failed to register SESSION_CLOSES_TOTAL");
    registry
        .register(Box::new(POOL_RESOURCES.clone()))
        .expect("Failed to register POOL_RESOURCES");
    registry
        .register(Box::new(POOL_PROBE_FAILURES_TOTAL.clone()))
        .expect("Failed to register POOL_PROBE_FAILURES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
}

pub fn set_sessions_online(count: usize) {
    SESSIONS_ONLINE.set(count as i64);
}

pub fn record_frame_in() {
    FRAMES_TOTAL.with_label_values(&["in"]).inc();
}

pub fn record_frame_out() {
    FRAMES_TOTAL.with_label_values(&["out"]).inc();
}

pub fn record_frame_dropped() {
    FRAMES_TOTAL.with_label_values(&["dropped"]).inc();
}

pub fn record_session_close(reason: &str) {
    SESSION_CLOSES_TOTAL.with_label_values(&[reason]).inc();
}

/// Helper to update resource pool stats
pub fn set_pool_status(pool: &str, idle: usize, checked_out: usize) {
    POOL_RESOURCES
        .with_label_values(&[pool, "idle"])
        .set(idle as i64);
    POOL_RESOURCES
        .with_label_values(&[pool, "checked_out"])
        .set(checked_out as i64);
}

pub fn record_pool_probe_failure(pool: &str) {
    POOL_PROBE_FAILURES_TOTAL.with_label_values(&[pool]).inc();
}
