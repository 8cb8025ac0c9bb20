//! Presentation Layer
//!
//! HTTP routes for the gateway and directory roles, and the chat TCP server.

pub mod http;
pub mod middleware;
pub mod tcp;
