//! Application layer for huddle-broker.
//!
//! # Responsibilities
//!
//! - Dispatching decoded client messages to the registry, matcher, and
//!   group store
//! - Deciding who receives which outbound message
//! - Defining the `Outbox` seam through which deliveries leave the core
//!
//! # What does NOT belong here?
//!
//! - Sockets, channels, or task spawning (that is infrastructure)
//! - JSON field layout (that is `huddle_core::protocol`)

pub mod router;

pub use router::{Broker, Outbox, RouteError};
