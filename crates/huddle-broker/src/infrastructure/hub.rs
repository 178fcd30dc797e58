//! Hub: the single task that owns all broker state.
//!
//! Every WebSocket session runs in its own Tokio task, but none of them
//! touches the registry or group store directly.  Instead each session sends
//! [`HubEvent`]s into one channel, and the hub task handles them strictly one
//! at a time:
//!
//! ```text
//! session A ──┐
//! session B ──┼──► mpsc<HubEvent> ──► hub task (owns Broker)
//! session C ──┘                           │
//!                                         ├──► outbound queue A ──► writer A
//!                                         ├──► outbound queue B ──► writer B
//!                                         └──► outbound queue C ──► writer C
//! ```
//!
//! # Why a channel instead of a Mutex? (for beginners)
//!
//! A `Mutex<Broker>` would also serialize access, but every session would
//! then hold the lock while it formats and queues JSON for other sessions.
//! With a channel the hub is the only owner, so `Broker` needs no locking at
//! all and its methods can take plain `&mut self`.
//!
//! # Outbound policy
//!
//! Each session has a bounded outbound queue.  The hub uses `try_send`, so a
//! client that stops reading can never stall the hub: once its queue is full,
//! further messages to that client are dropped and logged.

use std::collections::HashMap;

use huddle_core::{encode_server_message, ConnectionId, ServerMessage};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::{Broker, Outbox, RouteError};

/// Capacity of the channel carrying session events into the hub.
const HUB_CHANNEL_CAPACITY: usize = 1024;

/// Something a session reports to the hub.
#[derive(Debug)]
pub enum HubEvent {
    /// A WebSocket session is open; `outbound` feeds its writer task.
    Connected {
        conn: ConnectionId,
        outbound: mpsc::Sender<String>,
    },
    /// One text frame received from the client.
    Frame { conn: ConnectionId, text: String },
    /// The session ended.  Sent exactly once per `Connected`.
    Closed { conn: ConnectionId },
}

/// Cloneable sender side of the hub, handed to every session task.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    /// Sends an event to the hub.
    ///
    /// Returns `false` if the hub has shut down.
    pub async fn send(&self, event: HubEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Outbox backed by each session's outbound queue.
#[derive(Debug, Default)]
struct ChannelOutbox {
    peers: HashMap<ConnectionId, mpsc::Sender<String>>,
}

impl Outbox for ChannelOutbox {
    fn deliver(&mut self, to: ConnectionId, message: ServerMessage) {
        let Some(queue) = self.peers.get(&to) else {
            debug!("connection {to}: no outbound queue, dropping {}", message.kind());
            return;
        };

        let text = match encode_server_message(&message) {
            Ok(text) => text,
            Err(e) => {
                warn!("connection {to}: {e}");
                return;
            }
        };

        match queue.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    "connection {to}: outbound queue full, dropping {}",
                    message.kind()
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!("connection {to}: writer gone, dropping {}", message.kind());
            }
        }
    }
}

/// Starts the hub task around `broker`.
///
/// The task runs until every [`HubHandle`] clone has been dropped.
pub fn spawn_hub(broker: Broker) -> (HubHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(HUB_CHANNEL_CAPACITY);
    let task = tokio::spawn(run_hub(broker, rx));
    (HubHandle { tx }, task)
}

async fn run_hub(mut broker: Broker, mut rx: mpsc::Receiver<HubEvent>) {
    let mut outbox = ChannelOutbox::default();

    while let Some(event) = rx.recv().await {
        match event {
            HubEvent::Connected { conn, outbound } => {
                debug!("connection {conn}: attached to hub");
                outbox.peers.insert(conn, outbound);
            }
            HubEvent::Frame { conn, text } => {
                match broker.handle_frame(conn, &text, &mut outbox) {
                    Ok(()) => {}
                    Err(RouteError::Decode(e)) => {
                        warn!("connection {conn}: dropping frame: {e}");
                    }
                    Err(e) => {
                        debug!("connection {conn}: dropping message: {e}");
                    }
                }
            }
            HubEvent::Closed { conn } => {
                outbox.peers.remove(&conn);
                let removed = broker.handle_disconnect(conn);
                debug!("connection {conn}: detached, {removed} identity(ies) removed");
            }
        }
    }

    info!(
        "hub stopped ({} registered, {} groups)",
        broker.registry().len(),
        broker.groups().len()
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
