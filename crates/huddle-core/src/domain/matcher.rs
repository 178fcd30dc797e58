//! GroupMatcher: turns the pool of waiting connections into groups.
//!
//! # Algorithm
//!
//! A matching pass runs after every `join`:
//!
//! 1. Bucket every *waiting* connection by interest tag, keeping join order
//!    inside each bucket.
//! 2. For each bucket with at least `min` connections, repeatedly take up to
//!    `max` from the front and form a group, until fewer than `min` remain.
//! 3. Give each new group an identity, store it, and mark every member as
//!    grouped.
//!
//! With the default limits (4 and 6) a bucket of 4 or 5 becomes one group of
//! that size, a bucket of 6 to 9 becomes one group of 6 with the rest left
//! waiting, and a bucket of 10 becomes 6 + 4.
//!
//! ```text
//! waiting "x": [1, 2, 3, 4, 5, 6, 7]
//!                └──── group ────┘ └ stays waiting
//! ```

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::groups::GroupStore;
use crate::domain::ids::{ConnectionId, GroupId, UserId};
use crate::domain::registry::ConnectionRegistry;

/// Default minimum number of waiting connections needed to form a group.
pub const DEFAULT_MIN_GROUP_SIZE: usize = 4;

/// Default maximum number of members in a newly formed group.
pub const DEFAULT_MAX_GROUP_SIZE: usize = 6;

/// Rejected group size configuration.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid group size limits: min={min}, max={max} (need 1 <= min <= max)")]
pub struct InvalidGroupSize {
    pub min: usize,
    pub max: usize,
}

/// Minimum and maximum size of a group at formation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSizeLimits {
    min: usize,
    max: usize,
}

impl GroupSizeLimits {
    /// # Errors
    ///
    /// Returns [`InvalidGroupSize`] unless `1 <= min <= max`.
    pub fn new(min: usize, max: usize) -> Result<Self, InvalidGroupSize> {
        if min == 0 || min > max {
            return Err(InvalidGroupSize { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl Default for GroupSizeLimits {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_GROUP_SIZE,
            max: DEFAULT_MAX_GROUP_SIZE,
        }
    }
}

// ── Group identity generation ─────────────────────────────────────────────────

/// Clock returning milliseconds since the Unix epoch.
pub type MillisClock = Box<dyn Fn() -> u64 + Send>;

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Produces group identities of the form `"{tag}-{millis}"`.
///
/// The millisecond stamp is forced to be strictly increasing per tag: if two
/// groups for the same tag form within the same millisecond (or the clock
/// steps backwards), the second one uses the previous stamp plus one.
pub struct GroupIdGenerator {
    clock: MillisClock,
    last_stamp: HashMap<String, u64>,
}

impl GroupIdGenerator {
    /// Generator backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Box::new(system_millis))
    }

    /// Generator backed by a custom clock (used by tests).
    pub fn with_clock(clock: MillisClock) -> Self {
        Self {
            clock,
            last_stamp: HashMap::new(),
        }
    }

    pub fn next_id(&mut self, tag: &str) -> GroupId {
        let now = (self.clock)();
        let stamp = match self.last_stamp.get(tag) {
            Some(&prev) if now <= prev => prev + 1,
            _ => now,
        };
        self.last_stamp.insert(tag.to_string(), stamp);
        GroupId::new(format!("{tag}-{stamp}"))
    }
}

impl Default for GroupIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GroupIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupIdGenerator")
            .field("tags", &self.last_stamp.len())
            .finish()
    }
}

// ── Matcher ───────────────────────────────────────────────────────────────────

/// A group created by one matching pass, with everything needed to notify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormedGroup {
    pub id: GroupId,
    pub interest: String,
    /// `(identity, transport handle)` of each member, in join order.
    pub members: Vec<(UserId, ConnectionId)>,
}

/// Forms groups out of waiting connections.
#[derive(Debug, Default)]
pub struct GroupMatcher {
    limits: GroupSizeLimits,
    ids: GroupIdGenerator,
}

impl GroupMatcher {
    pub fn new(limits: GroupSizeLimits) -> Self {
        Self::with_id_generator(limits, GroupIdGenerator::new())
    }

    pub fn with_id_generator(limits: GroupSizeLimits, ids: GroupIdGenerator) -> Self {
        Self { limits, ids }
    }

    pub fn limits(&self) -> GroupSizeLimits {
        self.limits
    }

    /// Runs one matching pass over the registry.
    ///
    /// Newly formed groups are stored in `groups`, their members are marked
    /// in `registry`, and the groups are returned in formation order so the
    /// caller can notify them.  If the store rejects a generated identity the
    /// formation is abandoned and its members stay waiting.
    pub fn run(
        &mut self,
        registry: &mut ConnectionRegistry,
        groups: &mut GroupStore,
    ) -> Vec<FormedGroup> {
        let mut formed = Vec::new();

        for (interest, mut bucket) in self.buckets(registry) {
            while bucket.len() >= self.limits.min {
                let take = bucket.len().min(self.limits.max);
                let members: Vec<(UserId, ConnectionId)> = bucket.drain(..take).collect();
                let id = self.ids.next_id(&interest);
                let member_ids: Vec<UserId> = members.iter().map(|(user, _)| *user).collect();

                if let Err(e) = groups.create(id.clone(), interest.as_str(), member_ids) {
                    warn!("dropping group formation for '{interest}': {e}");
                    continue;
                }

                for (user_id, _) in &members {
                    registry.set_group(*user_id, id.clone());
                }

                info!(
                    group = %id,
                    interest = %interest,
                    size = members.len(),
                    "group formed"
                );

                formed.push(FormedGroup {
                    id,
                    interest: interest.clone(),
                    members,
                });
            }
        }

        formed
    }

    /// Buckets waiting connections by interest tag.
    ///
    /// Buckets are returned in the order their tag first appears in the
    /// registry; members inside a bucket are in join order.
    fn buckets(&self, registry: &ConnectionRegistry) -> Vec<(String, Vec<(UserId, ConnectionId)>)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut buckets: Vec<(String, Vec<(UserId, ConnectionId)>)> = Vec::new();

        for conn in registry.waiting() {
            let slot = *index.entry(conn.interest.as_str()).or_insert_with(|| {
                buckets.push((conn.interest.clone(), Vec::new()));
                buckets.len() - 1
            });
            buckets[slot].1.push((conn.user_id, conn.handle));
        }

        buckets
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn fixed_clock(millis: u64) -> MillisClock {
        Box::new(move || millis)
    }

    fn matcher_at(millis: u64) -> GroupMatcher {
        GroupMatcher::with_id_generator(
            GroupSizeLimits::default(),
            GroupIdGenerator::with_clock(fixed_clock(millis)),
        )
    }

    fn join_n(registry: &mut ConnectionRegistry, tag: &str, n: usize) -> Vec<UserId> {
        (0..n)
            .map(|_| registry.register(ConnectionId::new(), tag))
            .collect()
    }

    #[test]
    fn test_limits_reject_zero_min() {
        assert_eq!(
            GroupSizeLimits::new(0, 6),
            Err(InvalidGroupSize { min: 0, max: 6 })
        );
    }

    #[test]
    fn test_limits_reject_min_above_max() {
        assert!(GroupSizeLimits::new(5, 4).is_err());
        assert!(GroupSizeLimits::new(3, 3).is_ok());
    }

    #[test]
    fn test_id_uses_tag_and_clock() {
        let mut ids = GroupIdGenerator::with_clock(fixed_clock(1_700_000_000_000));
        assert_eq!(ids.next_id("chess").as_str(), "chess-1700000000000");
    }

    #[test]
    fn test_id_is_unique_when_clock_does_not_advance() {
        let mut ids = GroupIdGenerator::with_clock(fixed_clock(1000));

        let a = ids.next_id("x");
        let b = ids.next_id("x");
        let c = ids.next_id("y");

        assert_eq!(a.as_str(), "x-1000");
        assert_eq!(b.as_str(), "x-1001");
        // Other tags keep their own sequence.
        assert_eq!(c.as_str(), "y-1000");
    }

    #[test]
    fn test_id_follows_clock_once_it_overtakes() {
        let now = Arc::new(AtomicU64::new(1000));
        let clock_now = Arc::clone(&now);
        let mut ids =
            GroupIdGenerator::with_clock(Box::new(move || clock_now.load(Ordering::Relaxed)));

        ids.next_id("x");
        ids.next_id("x"); // x-1001
        now.store(5000, Ordering::Relaxed);

        assert_eq!(ids.next_id("x").as_str(), "x-5000");
    }

    #[test]
    fn test_three_waiting_form_nothing() {
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        join_n(&mut registry, "x", 3);

        let formed = matcher_at(1).run(&mut registry, &mut groups);

        assert!(formed.is_empty());
        assert!(groups.is_empty());
        assert_eq!(registry.waiting().count(), 3);
    }

    #[test]
    fn test_four_waiting_form_one_group_in_join_order() {
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        let ids = join_n(&mut registry, "x", 4);

        let formed = matcher_at(7).run(&mut registry, &mut groups);

        assert_eq!(formed.len(), 1);
        let members: Vec<UserId> = formed[0].members.iter().map(|(u, _)| *u).collect();
        assert_eq!(members, ids);
        assert_eq!(formed[0].id.as_str(), "x-7");
        assert_eq!(groups.lookup(&formed[0].id).unwrap().members, ids);
        assert_eq!(registry.waiting().count(), 0);
    }

    #[test]
    fn test_seven_waiting_form_six_and_leave_one() {
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        let ids = join_n(&mut registry, "y", 7);

        let formed = matcher_at(1).run(&mut registry, &mut groups);

        assert_eq!(formed.len(), 1);
        assert_eq!(formed[0].members.len(), 6);
        let left: Vec<UserId> = registry.waiting().map(|c| c.user_id).collect();
        assert_eq!(left, vec![ids[6]]);
    }

    #[test]
    fn test_nine_waiting_form_one_group_of_six() {
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        join_n(&mut registry, "z", 9);

        let formed = matcher_at(1).run(&mut registry, &mut groups);

        assert_eq!(formed.len(), 1);
        assert_eq!(formed[0].members.len(), 6);
        assert_eq!(registry.waiting().count(), 3);
    }

    #[test]
    fn test_ten_waiting_form_six_then_four_with_distinct_ids() {
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        join_n(&mut registry, "z", 10);

        let formed = matcher_at(1).run(&mut registry, &mut groups);

        assert_eq!(formed.len(), 2);
        assert_eq!(formed[0].members.len(), 6);
        assert_eq!(formed[1].members.len(), 4);
        assert_ne!(formed[0].id, formed[1].id);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_tags_are_matched_independently() {
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        join_n(&mut registry, "a", 3);
        join_n(&mut registry, "b", 4);

        let formed = matcher_at(1).run(&mut registry, &mut groups);

        assert_eq!(formed.len(), 1);
        assert_eq!(formed[0].interest, "b");
        assert!(registry.waiting().all(|c| c.interest == "a"));
    }

    #[test]
    fn test_grouped_connections_are_never_rematched() {
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        let mut matcher = matcher_at(1);
        join_n(&mut registry, "x", 4);
        matcher.run(&mut registry, &mut groups);

        // Three more joins: four grouped + three waiting must not form a group.
        join_n(&mut registry, "x", 3);
        let formed = matcher.run(&mut registry, &mut groups);

        assert!(formed.is_empty());
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_duplicate_id_leaves_members_waiting() {
        // Arrange: a store that already holds the id the generator will produce.
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        groups
            .create(GroupId::new("x-42"), "x", vec![UserId(100)])
            .unwrap();
        let mut matcher = GroupMatcher::with_id_generator(
            GroupSizeLimits::default(),
            GroupIdGenerator::with_clock(fixed_clock(42)),
        );
        join_n(&mut registry, "x", 4);

        // Act
        let formed = matcher.run(&mut registry, &mut groups);

        // Assert: formation dropped, nobody marked as grouped
        assert!(formed.is_empty());
        assert_eq!(registry.waiting().count(), 4);

        // The next pass gets a fresh stamp and succeeds.
        let formed = matcher.run(&mut registry, &mut groups);
        assert_eq!(formed.len(), 1);
        assert_eq!(formed[0].id.as_str(), "x-43");
    }

    #[test]
    fn test_custom_limits_are_respected() {
        let mut registry = ConnectionRegistry::new();
        let mut groups = GroupStore::new();
        let limits = GroupSizeLimits::new(2, 2).unwrap();
        let mut matcher =
            GroupMatcher::with_id_generator(limits, GroupIdGenerator::with_clock(fixed_clock(1)));
        join_n(&mut registry, "pair", 5);

        let formed = matcher.run(&mut registry, &mut groups);

        assert_eq!(formed.len(), 2);
        assert!(formed.iter().all(|g| g.members.len() == 2));
        assert_eq!(registry.waiting().count(), 1);
    }
}
