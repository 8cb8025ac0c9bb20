//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **DirectoryService**: least-loaded server selection and login tokens
//! - **GatewayService**: credential check and chat server handoff
//! - **DirectoryApi**: the directory RPC surface, local or remote

pub mod directory_api;
pub mod directory_service;
pub mod gateway_service;

pub use directory_api::DirectoryApi;
#[cfg(test)]
pub use directory_api::MockDirectoryApi;
pub use directory_service::DirectoryService;
pub use gateway_service::{GatewayError, GatewayService, Handoff};
