//! # Chat Backend Library
//!
//! Three cooperating services of a distributed chat backend:
//! - an HTTP **gateway** that checks credentials against PostgreSQL and
//!   hands the user off to a chat server
//! - a **directory** that picks the least-loaded chat server and issues
//!   one-time login tokens kept in Redis
//! - a TCP **chat server** speaking a length-prefixed JSON protocol
//!
//! ## Module Structure
//!
//! ```text
//! chat_backend/
//! +-- config/         Configuration management
//! +-- domain/         Entities and store/repository traits
//! +-- application/    Gateway and directory services, DTOs
//! +-- infrastructure/ Resource pools, PostgreSQL, Redis, directory RPC client
//! +-- presentation/   HTTP routers and the TCP chat server
//! +-- shared/         Error codes
//! ```

// Configuration module
pub mod config;

// Domain layer
pub mod domain;

// Application layer
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and TCP
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup
pub mod startup;

// Telemetry and observability
pub mod telemetry;
