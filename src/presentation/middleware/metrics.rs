//! Request Metrics Middleware
//!
//! Counts HTTP requests by method, matched route and status.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

use crate::infrastructure::metrics;

pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // Route template, not the raw URI.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_http_request(&method, &path, response.status().as_u16());
    response
}
