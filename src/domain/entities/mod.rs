//! # Domain Entities
//!
//! Core types shared by the gateway, directory and chat services, together
//! with the collaborator traits they are stored behind.
//!
//! - **UserCredentials**: the account fields a login is checked against
//! - **ServerDescriptor**: a chat server endpoint and its last known load
//! - **Token**: opaque login token bound to one uid
//!
//! ## Collaborator Traits
//!
//! `UserRepository`, `LoadStore` and `TokenStore` are implemented in the
//! infrastructure layer, following the dependency inversion principle.

mod chat_server;
mod token;
mod user;

pub use chat_server::{LoadStore, ServerDescriptor};
pub use token::{generate_token, TokenStore};
pub use user::{UserCredentials, UserRepository};

#[cfg(test)]
pub use chat_server::MockLoadStore;
#[cfg(test)]
pub use token::MockTokenStore;
#[cfg(test)]
pub use user::MockUserRepository;
