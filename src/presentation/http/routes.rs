//! Route Configuration
//!
//! Routers for the gateway and directory roles. Both carry the health and
//! metrics endpoints.

use axum::{
    extract::FromRef,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use super::state::{DirectoryState, GatewayState, PoolSet};
use crate::infrastructure::metrics;
use crate::infrastructure::rpc::paths;
use crate::presentation::middleware::{create_trace_layer, track_http_metrics};

/// Create the gateway router
pub fn create_gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/user_login", post(handlers::gateway::user_login))
        .merge(operational_routes())
        .layer(middleware::from_fn(track_http_metrics))
        .layer(create_trace_layer())
        .with_state(state)
}

/// Create the directory RPC router
pub fn create_directory_router(state: DirectoryState) -> Router {
    Router::new()
        .route(paths::GET_CHAT_SERVER, post(handlers::directory::get_chat_server))
        .route(paths::LOGIN, post(handlers::directory::login))
        .merge(operational_routes())
        .layer(middleware::from_fn(track_http_metrics))
        .layer(create_trace_layer())
        .with_state(state)
}

/// Health check and Prometheus endpoints
fn operational_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    PoolSet: FromRef<S>,
{
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(paths::LIVENESS, get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}
