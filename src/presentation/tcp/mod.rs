//! Chat TCP Server Module
//!
//! Long-lived framed sessions between chat clients and a chat server.
//!
//! # Architecture
//!
//! ```text
//!   TcpListener (main runtime)
//!        |  accept, round-robin
//!        v
//!   IoWorkerPool ---- worker 0 .. N-1 (current-thread runtimes)
//!        |
//!        v
//!   run_connection: FramedRead --> ChatLogic::dispatch
//!                   FramedWrite <-- Session send queue
//!        |
//!        v
//!   SessionRegistry <--- sweeper (heartbeat expiry)
//!        |
//!        v
//!   LoadReporter ---> shared counter store (read by the directory)
//! ```

pub mod connection;
pub mod frame;
pub mod load;
pub mod logic;
pub mod registry;
pub mod server;
pub mod session;
pub mod worker_pool;

pub use connection::{run_connection, serve_session, CloseReason, SessionLimits};
pub use frame::{message_id, Frame, FrameCodec, FrameError, ReadState};
pub use load::LoadReporter;
pub use logic::ChatLogic;
pub use registry::{RegistryError, SessionRegistry};
pub use server::{spawn_sweeper, ChatServer};
pub use session::{Session, SessionPhase};
pub use worker_pool::IoWorkerPool;
