//! Broker configuration types.
//!
//! [`BrokerConfig`] is the single source of truth for all runtime settings.
//! It is built from CLI arguments in `main.rs` or from defaults in tests.
//! Nothing here reads environment variables; that is the binary's job.

use std::net::SocketAddr;

use huddle_core::domain::matcher::{DEFAULT_MAX_GROUP_SIZE, DEFAULT_MIN_GROUP_SIZE};
use huddle_core::{GroupSizeLimits, InvalidGroupSize};
use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    GroupSize(#[from] InvalidGroupSize),

    #[error("outbound queue capacity must be at least 1")]
    ZeroOutboundQueue,
}

/// All runtime configuration for the broker.
///
/// # Example
///
/// ```rust
/// use huddle_broker::domain::BrokerConfig;
///
/// let cfg = BrokerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 3000);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// The address and port the WebSocket server binds to.
    pub bind_addr: SocketAddr,

    /// Waiting connections needed before a group forms.
    pub min_group_size: usize,

    /// Upper bound on the size of a newly formed group.
    pub max_group_size: usize,

    /// Per-connection outbound queue length.
    ///
    /// When a client stops reading and its queue fills up, further messages
    /// to that client are dropped instead of stalling the hub.
    pub outbound_queue_capacity: usize,
}

impl BrokerConfig {
    /// Checks that the values can drive a running broker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for group limits outside `1 <= min <= max` or a
    /// zero outbound queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.group_limits()?;
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::ZeroOutboundQueue);
        }
        Ok(())
    }

    /// Group size limits for the matcher.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::GroupSize`] if the limits are inconsistent.
    pub fn group_limits(&self) -> Result<GroupSizeLimits, ConfigError> {
        Ok(GroupSizeLimits::new(self.min_group_size, self.max_group_size)?)
    }
}

impl Default for BrokerConfig {
    /// | Field                   | Default        |
    /// |-------------------------|----------------|
    /// | bind_addr               | `0.0.0.0:3000` |
    /// | min_group_size          | 4              |
    /// | max_group_size          | 6              |
    /// | outbound_queue_capacity | 64             |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            outbound_queue_capacity: 64,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_3000() {
        let cfg = BrokerConfig::default();
        assert_eq!(cfg.bind_addr.port(), 3000);
    }

    #[test]
    fn test_default_group_sizes_are_four_and_six() {
        let cfg = BrokerConfig::default();
        assert_eq!(cfg.min_group_size, 4);
        assert_eq!(cfg.max_group_size, 6);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(BrokerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_min_above_max_is_rejected() {
        // Arrange
        let cfg = BrokerConfig {
            min_group_size: 8,
            max_group_size: 6,
            ..BrokerConfig::default()
        };

        // Act
        let result = cfg.validate();

        // Assert
        assert_eq!(
            result,
            Err(ConfigError::GroupSize(InvalidGroupSize { min: 8, max: 6 }))
        );
    }

    #[test]
    fn test_zero_outbound_queue_is_rejected() {
        let cfg = BrokerConfig {
            outbound_queue_capacity: 0,
            ..BrokerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroOutboundQueue));
    }

    #[test]
    fn test_group_limits_reflect_config() {
        let cfg = BrokerConfig {
            min_group_size: 2,
            max_group_size: 3,
            ..BrokerConfig::default()
        };
        let limits = cfg.group_limits().unwrap();
        assert_eq!((limits.min(), limits.max()), (2, 3));
    }
}
