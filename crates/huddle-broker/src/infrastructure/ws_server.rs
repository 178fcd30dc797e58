//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from clients.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Running two concurrent halves per session:
//!    - **Client → Hub**: reads text frames and forwards them to the hub.
//!    - **Hub → Client**: drains the session's outbound queue into text frames.
//! 5. Telling the hub exactly once when the session is over.
//! 6. Gracefully shutting down when the `running` flag is cleared.
//!
//! # Scalability
//!
//! Each client session runs in its own Tokio task.  The accept loop never
//! blocks on a session: it accepts a connection and immediately spawns a task
//! for it before accepting the next one.  All shared state lives in the hub
//! task (see [`crate::infrastructure::hub`]).

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use huddle_core::ConnectionId;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::Broker;
use crate::domain::config::BrokerConfig;
use crate::infrastructure::hub::{spawn_hub, HubEvent, HubHandle};

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves clients until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the TCP listener
/// cannot be bound (e.g., the port is already in use).
pub async fn run_server(config: BrokerConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    serve(listener, config, running).await
}

/// Runs the accept loop on an already bound listener.
///
/// Split out from [`run_server`] so tests can bind port 0 and learn the real
/// address before the loop starts.
///
/// # Errors
///
/// Returns an error if the group size limits in `config` are invalid.
pub async fn serve(
    listener: TcpListener,
    config: BrokerConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    config.validate().context("invalid broker configuration")?;
    let limits = config.group_limits()?;

    if let Ok(addr) = listener.local_addr() {
        info!(
            "huddle broker listening on {addr} (groups of {}..={})",
            limits.min(),
            limits.max()
        );
    }

    let (hub, _hub_task) = spawn_hub(Broker::new(limits));
    let queue_capacity = config.outbound_queue_capacity;

    loop {
        // Check the shutdown flag before each accept attempt.
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the loop can notice the shutdown flag even when
        // nobody is connecting.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let hub = hub.clone();
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, hub, queue_capacity).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout: loop back to check the `running` flag.
            }
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each per-session task; logs how the session ended.
async fn handle_client_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    hub: HubHandle,
    queue_capacity: usize,
) {
    match run_session(raw_stream, peer_addr, hub, queue_capacity).await {
        Ok(()) => info!("session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one client WebSocket session.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails or the hub is gone.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    hub: HubHandle,
    queue_capacity: usize,
) -> anyhow::Result<()> {
    // ── Step 1: Complete the WebSocket handshake ───────────────────────────────
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let conn = ConnectionId::new();
    info!("session {peer_addr}: established as connection {conn}");

    // ── Step 2: Attach to the hub ─────────────────────────────────────────────
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(queue_capacity);

    if !hub
        .send(HubEvent::Connected {
            conn,
            outbound: outbound_tx,
        })
        .await
    {
        anyhow::bail!("hub is not running");
    }

    // ── Step 3: Hub → Client writer ───────────────────────────────────────────
    //
    // Ends when the hub drops the queue sender or the socket rejects a write.
    let writer = async {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = ws_tx.send(WsMessage::Text(text)).await {
                debug!("session {peer_addr}: WebSocket send failed: {e}");
                break;
            }
        }
    };

    // ── Step 4: Client → Hub reader ───────────────────────────────────────────
    let reader = async {
        loop {
            let ws_msg = match ws_rx.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!("session {peer_addr}: WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!("session {peer_addr}: WebSocket error: {e}");
                    break;
                }
                None => {
                    debug!("session {peer_addr}: stream ended");
                    break;
                }
            };

            let text = match ws_msg {
                WsMessage::Text(text) => text,
                WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("session {peer_addr}: non-UTF-8 binary frame ignored");
                        continue;
                    }
                },
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
                WsMessage::Close(_) => {
                    debug!("session {peer_addr}: Close frame received");
                    break;
                }
            };

            if !hub.send(HubEvent::Frame { conn, text }).await {
                debug!("session {peer_addr}: hub stopped");
                break;
            }
        }
    };

    // ── Step 5: Wait for either half to finish ────────────────────────────────
    //
    // The other half is dropped (cancelled) when `select!` returns.
    tokio::select! {
        _ = writer => debug!("session {peer_addr}: writer ended"),
        _ = reader => debug!("session {peer_addr}: reader ended"),
    }

    hub.send(HubEvent::Closed { conn }).await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
