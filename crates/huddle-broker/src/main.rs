//! Huddle broker entry point.
//!
//! Accepts WebSocket connections, groups clients by interest tag, relays chat
//! inside groups, and forwards peer-connection negotiation messages between
//! two specific clients.
//!
//! # Usage
//!
//! ```text
//! huddle-broker [OPTIONS]
//!
//! Options:
//!   --bind            <ADDR>  IP address to listen on      [default: 0.0.0.0]
//!   --port            <PORT>  WebSocket listener port      [default: 3000]
//!   --min-group-size  <N>     Waiting clients per group    [default: 4]
//!   --max-group-size  <N>     Largest group at formation   [default: 6]
//!   --outbound-queue  <N>     Per-client outbound queue    [default: 64]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                | Default   | Description                  |
//! |-------------------------|-----------|------------------------------|
//! | `HUDDLE_BIND`           | `0.0.0.0` | Listen address               |
//! | `PORT`                  | `3000`    | Listen port                  |
//! | `HUDDLE_MIN_GROUP_SIZE` | `4`       | Minimum group size           |
//! | `HUDDLE_MAX_GROUP_SIZE` | `6`       | Maximum group size           |
//! | `HUDDLE_OUTBOUND_QUEUE` | `64`      | Outbound queue per client    |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use huddle_broker::domain::BrokerConfig;
use huddle_broker::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Huddle matchmaking and signaling relay broker.
#[derive(Debug, Parser)]
#[command(
    name = "huddle-broker",
    about = "WebSocket matchmaking and signaling relay broker",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket server to.
    #[arg(long, default_value = "0.0.0.0", env = "HUDDLE_BIND")]
    bind: String,

    /// TCP port for the WebSocket server to listen on.
    #[arg(long, default_value_t = 3000, env = "PORT")]
    port: u16,

    /// Number of waiting clients with the same interest needed to form a group.
    #[arg(long, default_value_t = 4, env = "HUDDLE_MIN_GROUP_SIZE")]
    min_group_size: usize,

    /// Largest group the matcher will form in one go.
    #[arg(long, default_value_t = 6, env = "HUDDLE_MAX_GROUP_SIZE")]
    max_group_size: usize,

    /// Messages buffered per client before further ones are dropped.
    #[arg(long, default_value_t = 64, env = "HUDDLE_OUTBOUND_QUEUE")]
    outbound_queue: usize,
}

impl Cli {
    /// Converts the parsed CLI arguments into a validated [`BrokerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address or the group and
    /// queue settings are inconsistent.
    fn into_broker_config(self) -> anyhow::Result<BrokerConfig> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        let config = BrokerConfig {
            bind_addr,
            min_group_size: self.min_group_size,
            max_group_size: self.max_group_size,
            outbound_queue_capacity: self.outbound_queue,
        };
        config.validate().context("invalid broker settings")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_broker_config()?;

    info!("huddle broker starting on {}", config.bind_addr);

    // Ctrl+C clears the flag; the accept loop polls it every 200 ms.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("huddle broker stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
