//! huddle-broker library crate.
//!
//! This crate hosts the matchmaking broker: clients connect over WebSocket,
//! declare an interest tag, get grouped with other clients sharing that tag,
//! chat inside the group, and relay peer-connection negotiation messages to
//! one specific peer.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Clients (JSON over WebSocket)
//!         ↕
//! [huddle-broker]
//!   ├── domain/           BrokerConfig
//!   ├── application/      Broker: dispatches client messages (the router)
//!   └── infrastructure/
//!         ├── ws_server/  WebSocket accept loop and per-session tasks
//!         └── hub/        Single task that owns the Broker state
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `huddle-core` only.
//! - `infrastructure` depends on all other layers plus `tokio` and `tungstenite`.
//!
//! # Concurrency model
//!
//! Every session task forwards what it reads to one hub task over a channel.
//! The hub owns the registry and group store and handles events one at a
//! time, so shared state is never touched from two tasks at once.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: message routing over registry and group state.
pub mod application;

/// Infrastructure layer: WebSocket server and the dispatch hub.
pub mod infrastructure;
