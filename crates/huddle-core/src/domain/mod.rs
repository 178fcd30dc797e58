//! Domain layer: pure state machines with no I/O.
//!
//! # What belongs here?
//!
//! - Identity types for users, groups, and transport connections
//! - The live-connection registry
//! - The group store and the matcher that fills it
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - Anything that sends bytes to a client

pub mod groups;
pub mod ids;
pub mod matcher;
pub mod registry;

pub use groups::{Group, GroupError, GroupStore};
pub use ids::{ConnectionId, GroupId, UserId};
pub use matcher::{FormedGroup, GroupIdGenerator, GroupMatcher, GroupSizeLimits, InvalidGroupSize};
pub use registry::{Connection, ConnectionRegistry};
