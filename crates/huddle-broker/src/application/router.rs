//! Broker: routes decoded client messages to the right recipients.
//!
//! This is the heart of the broker.  It owns the [`ConnectionRegistry`], the
//! [`GroupStore`], and the [`GroupMatcher`], and decides for every inbound
//! message who hears about it:
//!
//! | type                          | action                               | outbound            |
//! |-------------------------------|--------------------------------------|---------------------|
//! | `join`                        | register, run matcher                | `group_formed` to each new member |
//! | `message`                     | look up group                        | `message` to every member |
//! | `leave`                       | remove member from group             | none                |
//! | `offer` / `answer` / `candidate` | look up target identity           | same type, to the target only |
//! | anything else                 | ignored                              | none                |
//!
//! # Architecture
//!
//! The broker never touches a socket.  Deliveries go through the [`Outbox`]
//! trait; the hub implements it with per-connection channels, tests implement
//! it with a recording double.  Nothing is ever sent back to the originator of
//! a message that could not be routed; [`RouteError`] exists only so the
//! caller can log what happened.

use huddle_core::{
    decode_client_message, ClientMessage, ConnectionId, ConnectionRegistry, GroupId,
    GroupMatcher, GroupSizeLimits, GroupStore, ProtocolError, ServerMessage, UserId,
};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Why an inbound message produced no delivery.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Decode(#[from] ProtocolError),
    #[error("unknown group: {0}")]
    UnknownGroup(GroupId),
    #[error("unknown target user: {0}")]
    UnknownTarget(UserId),
}

/// Destination for outbound messages.
///
/// Implementations must not block: a delivery is best effort and may be
/// dropped if the recipient cannot take it right now.
pub trait Outbox {
    fn deliver(&mut self, to: ConnectionId, message: ServerMessage);
}

/// Which of the three relayed signaling messages is being forwarded.
#[derive(Debug, Clone, Copy)]
enum Signal {
    Offer,
    Answer,
    Candidate,
}

impl Signal {
    fn into_message(self, payload: Value, sender: UserId) -> ServerMessage {
        match self {
            Signal::Offer => ServerMessage::Offer {
                offer: payload,
                user_id: sender,
            },
            Signal::Answer => ServerMessage::Answer {
                answer: payload,
                user_id: sender,
            },
            Signal::Candidate => ServerMessage::Candidate {
                candidate: payload,
                user_id: sender,
            },
        }
    }
}

/// Connection, group, and matching state for one broker instance.
///
/// Every method takes `&mut self`; whoever owns the `Broker` serializes all
/// access to it.
#[derive(Debug)]
pub struct Broker {
    registry: ConnectionRegistry,
    groups: GroupStore,
    matcher: GroupMatcher,
}

impl Broker {
    pub fn new(limits: GroupSizeLimits) -> Self {
        Self::with_matcher(GroupMatcher::new(limits))
    }

    /// Builds a broker around a preconfigured matcher (e.g. a fixed clock).
    pub fn with_matcher(matcher: GroupMatcher) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            groups: GroupStore::new(),
            matcher,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn groups(&self) -> &GroupStore {
        &self.groups
    }

    /// Decodes one text frame from `from` and routes it.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Decode`] for malformed frames, or whatever
    /// [`Broker::handle_message`] returns.  State is never modified by a
    /// frame that fails to decode.
    pub fn handle_frame(
        &mut self,
        from: ConnectionId,
        frame: &str,
        outbox: &mut dyn Outbox,
    ) -> Result<(), RouteError> {
        let msg = decode_client_message(frame)?;
        self.handle_message(from, msg, outbox)
    }

    /// Routes one decoded client message.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::UnknownGroup`] or [`RouteError::UnknownTarget`]
    /// when a lookup misses.  The message is dropped in that case.
    pub fn handle_message(
        &mut self,
        from: ConnectionId,
        msg: ClientMessage,
        outbox: &mut dyn Outbox,
    ) -> Result<(), RouteError> {
        debug!("connection {from}: routing {}", msg.kind());

        match msg {
            ClientMessage::Join { interests } => {
                self.join(from, interests, outbox);
                Ok(())
            }
            ClientMessage::Message {
                group_id,
                message,
                user_id,
            } => self.broadcast(&group_id, message, user_id, outbox),
            ClientMessage::Leave { user_id, group_id } => self.leave(user_id, &group_id),
            ClientMessage::Offer {
                offer,
                user_id,
                target_user_id,
            } => self.relay(Signal::Offer, offer, user_id, target_user_id, outbox),
            ClientMessage::Answer {
                answer,
                user_id,
                target_user_id,
            } => self.relay(Signal::Answer, answer, user_id, target_user_id, outbox),
            ClientMessage::Candidate {
                candidate,
                user_id,
                target_user_id,
            } => self.relay(Signal::Candidate, candidate, user_id, target_user_id, outbox),
            ClientMessage::Unrecognized => Ok(()),
        }
    }

    /// Forgets every join made over `conn`.
    ///
    /// Each removed identity is also taken out of the membership of the group
    /// it was in, so later broadcasts to that group skip it.  Returns the
    /// number of identities removed; unknown connections return 0.
    pub fn handle_disconnect(&mut self, conn: ConnectionId) -> usize {
        let removed = self.registry.unregister(conn);
        for record in &removed {
            if let Some(group_id) = &record.group_id {
                self.groups.remove_member(group_id, record.user_id);
            }
        }
        removed.len()
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    fn join(&mut self, from: ConnectionId, interests: String, outbox: &mut dyn Outbox) {
        let user_id = self.registry.register(from, interests);
        debug!("connection {from}: joined as user {user_id}");

        for group in self.matcher.run(&mut self.registry, &mut self.groups) {
            for (_, handle) in &group.members {
                outbox.deliver(
                    *handle,
                    ServerMessage::GroupFormed {
                        group_id: group.id.clone(),
                    },
                );
            }
        }
    }

    fn broadcast(
        &self,
        group_id: &GroupId,
        message: Value,
        sender: UserId,
        outbox: &mut dyn Outbox,
    ) -> Result<(), RouteError> {
        let group = self
            .groups
            .lookup(group_id)
            .ok_or_else(|| RouteError::UnknownGroup(group_id.clone()))?;

        for member in &group.members {
            if let Some(conn) = self.registry.find_by_identity(*member) {
                outbox.deliver(
                    conn.handle,
                    ServerMessage::Message {
                        message: message.clone(),
                        user_id: sender,
                    },
                );
            }
        }
        Ok(())
    }

    fn leave(&mut self, user_id: UserId, group_id: &GroupId) -> Result<(), RouteError> {
        if !self.groups.contains(group_id) {
            return Err(RouteError::UnknownGroup(group_id.clone()));
        }
        self.groups.remove_member(group_id, user_id);
        // Back to the waiting pool; the next matching pass may place it again.
        self.registry.clear_group(user_id, group_id);
        Ok(())
    }

    fn relay(
        &self,
        signal: Signal,
        payload: Value,
        sender: UserId,
        target: UserId,
        outbox: &mut dyn Outbox,
    ) -> Result<(), RouteError> {
        let conn = self
            .registry
            .find_by_identity(target)
            .ok_or(RouteError::UnknownTarget(target))?;
        outbox.deliver(conn.handle, signal.into_message(payload, sender));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
