//! GroupStore: formed groups keyed by their identity.
//!
//! Groups are created by the matcher and only ever shrink afterwards (a
//! member leaves or disconnects).  A group that shrinks to zero members is
//! kept as an empty entry; nothing removes groups from the store.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::ids::{GroupId, UserId};

/// Error type for group store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("group id already exists: {0}")]
    DuplicateGroupId(GroupId),
}

/// A formed group and its current members, in the order they were matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub interest: String,
    pub members: Vec<UserId>,
}

impl Group {
    pub fn contains(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }
}

/// In-memory store of every group formed since startup.
#[derive(Debug, Default)]
pub struct GroupStore {
    groups: HashMap<GroupId, Group>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new group.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::DuplicateGroupId`] if a group with the same
    /// identity already exists; the existing group is left untouched.
    pub fn create(
        &mut self,
        id: GroupId,
        interest: impl Into<String>,
        members: Vec<UserId>,
    ) -> Result<(), GroupError> {
        if self.groups.contains_key(&id) {
            return Err(GroupError::DuplicateGroupId(id));
        }
        let group = Group {
            id: id.clone(),
            interest: interest.into(),
            members,
        };
        self.groups.insert(id, group);
        Ok(())
    }

    pub fn lookup(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    /// Removes `user_id` from the group's members.
    ///
    /// Returns `true` if the member was present.  Unknown groups and
    /// non-members are a no-op.
    pub fn remove_member(&mut self, id: &GroupId, user_id: UserId) -> bool {
        match self.groups.get_mut(id) {
            Some(group) => {
                let before = group.members.len();
                group.members.retain(|m| *m != user_id);
                group.members.len() != before
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &GroupId) -> bool {
        self.groups.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
