//! HTTP Module
//!
//! Gateway and directory routers, their handlers and shared state.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::{create_directory_router, create_gateway_router};
pub use state::{DirectoryState, GatewayState, PoolSet};
