//! Domain layer for huddle-broker.
//!
//! Holds the broker's runtime configuration.  The protocol types and the
//! registry/group state machines live in `huddle-core`.

pub mod config;

pub use config::{BrokerConfig, ConfigError};
