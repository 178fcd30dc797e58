//! Infrastructure layer for huddle-broker.
//!
//! # Responsibilities
//!
//! - Binding a TCP listener for client WebSocket connections
//! - Performing the WebSocket HTTP upgrade handshake
//! - Spawning per-session Tokio tasks
//! - Funnelling every session's events into the single hub task
//! - Handling the graceful shutdown signal

pub mod hub;
pub mod ws_server;

pub use hub::{spawn_hub, HubEvent, HubHandle};
pub use ws_server::{run_server, serve};
