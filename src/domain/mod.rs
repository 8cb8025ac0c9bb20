//! # Domain Layer
//!
//! The domain layer holds the types every service agrees on: chat server
//! descriptors, login tokens and user credentials. It is independent of any
//! external frameworks or infrastructure concerns.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Collaborator traits define data access contracts
//! - The shared stores are the only state the services coordinate through

pub mod entities;

// Re-export commonly used types
pub use entities::*;
