//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod directory;
pub mod gateway;
pub mod health;
