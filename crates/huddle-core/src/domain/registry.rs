//! ConnectionRegistry: authoritative list of live, joined connections.
//!
//! Every successful `join` creates one [`Connection`] record:
//!
//! ```text
//! (handle, user_id, interest, group_id)
//!    │        │        │          └─ None while waiting, Some(..) once matched
//!    │        │        └─ interest tag, fixed at join time
//!    │        └─ integer identity, 1, 2, 3, ... never reused
//!    └─ transport handle the record was created from
//! ```
//!
//! # Why a `Vec` and not a `HashMap`?
//!
//! The matcher must see waiting connections in the order they joined
//! (first-registered, first-matched).  A `Vec` keeps insertion order for free;
//! lookups by identity are linear, which is fine for the number of clients a
//! single broker holds.

use crate::domain::ids::{ConnectionId, GroupId, UserId};

/// A joined connection as tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub handle: ConnectionId,
    pub user_id: UserId,
    pub interest: String,
    pub group_id: Option<GroupId>,
}

impl Connection {
    /// `true` while the connection is waiting to be matched.
    pub fn is_waiting(&self) -> bool {
        self.group_id.is_none()
    }
}

/// In-memory registry of all joined connections.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
    next_id: u64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self {
            connections: Vec::new(),
            next_id: 1,
        }
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a join and returns the identity assigned to it.
    ///
    /// The same handle may join more than once; each join gets its own
    /// identity and its own record.
    pub fn register(&mut self, handle: ConnectionId, interest: impl Into<String>) -> UserId {
        let user_id = UserId(self.next_id);
        self.next_id += 1;
        self.connections.push(Connection {
            handle,
            user_id,
            interest: interest.into(),
            group_id: None,
        });
        user_id
    }

    /// Removes every record created from `handle` and returns them.
    ///
    /// Unknown handles are a no-op, so duplicate close notifications are
    /// harmless.
    pub fn unregister(&mut self, handle: ConnectionId) -> Vec<Connection> {
        let mut removed = Vec::new();
        self.connections.retain(|conn| {
            if conn.handle == handle {
                removed.push(conn.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Looks up a connection by its assigned identity.
    pub fn find_by_identity(&self, user_id: UserId) -> Option<&Connection> {
        self.connections.iter().find(|conn| conn.user_id == user_id)
    }

    /// Returns a snapshot of all connections in join order.
    pub fn all(&self) -> Vec<Connection> {
        self.connections.clone()
    }

    /// Iterates over connections not yet in a group, in join order.
    pub fn waiting(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|conn| conn.is_waiting())
    }

    /// Marks `user_id` as a member of `group_id`.
    pub fn set_group(&mut self, user_id: UserId, group_id: GroupId) {
        if let Some(conn) = self.connections.iter_mut().find(|c| c.user_id == user_id) {
            conn.group_id = Some(group_id);
        }
    }

    /// Clears the group of `user_id` if it is currently `group_id`.
    ///
    /// Returns `true` when the connection went back to waiting.
    pub fn clear_group(&mut self, user_id: UserId, group_id: &GroupId) -> bool {
        match self.connections.iter_mut().find(|c| c.user_id == user_id) {
            Some(conn) if conn.group_id.as_ref() == Some(group_id) => {
                conn.group_id = None;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
