//! # huddle-core
//!
//! Shared library for the huddle matchmaking broker containing the JSON wire
//! protocol and the pure domain state machines that group and track clients.
//!
//! This crate has zero dependencies on sockets, async runtimes, or the
//! WebSocket library.  Everything here can be driven from a plain unit test.
//!
//! # Architecture overview (for beginners)
//!
//! Clients connect to the broker and declare an *interest tag* (for example
//! `"rust"` or `"chess"`).  Once enough clients share a tag, the broker forms
//! a *group* and tells every member the new group identity.  Members can then
//! chat inside the group and negotiate direct peer connections with each
//! other through the broker.
//!
//! - **`protocol`** – What travels over the wire.  Every frame is one JSON
//!   object with a `"type"` discriminant; it is decoded into a typed Rust enum
//!   so the rest of the code never touches raw JSON fields.
//!
//! - **`domain`** – The state machines: the [`ConnectionRegistry`] of live
//!   connections, the [`GroupStore`] of formed groups, and the
//!   [`GroupMatcher`] that turns a pool of waiting connections into groups.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `huddle_core::GroupMatcher` instead of `huddle_core::domain::matcher::GroupMatcher`.
pub use domain::groups::{Group, GroupError, GroupStore};
pub use domain::ids::{ConnectionId, GroupId, UserId};
pub use domain::matcher::{
    FormedGroup, GroupIdGenerator, GroupMatcher, GroupSizeLimits, InvalidGroupSize,
};
pub use domain::registry::{Connection, ConnectionRegistry};
pub use protocol::codec::{decode_client_message, encode_server_message, ProtocolError};
pub use protocol::messages::{ClientMessage, ServerMessage};
