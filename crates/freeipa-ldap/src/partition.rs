//! User partitions and their fetch-once caches.

use crate::{dn::DistinguishedName, group::GroupEntry, user::UserEntry, Result};
use freeipa_core::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Container of group entries relative to the base DN.
pub const GROUPS_TEMPLATE: &str = "cn=groups,cn=accounts";

/// Namespaces holding users in different lifecycle states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Regular, active users.
    #[default]
    Active,
    /// Staged users awaiting activation.
    Stage,
    /// Preserved (soft-deleted) users.
    Preserved,
}

impl Partition {
    /// Every partition, in lookup-table order.
    pub const ALL: [Self; 3] = [Self::Active, Self::Stage, Self::Preserved];

    /// Container of this partition's users, relative to the base DN.
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::Active => "cn=users,cn=accounts",
            Self::Stage => "cn=staged users,cn=accounts,cn=provisioning",
            Self::Preserved => "cn=deleted users,cn=accounts,cn=provisioning",
        }
    }

    /// Short name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Stage => "stage",
            Self::Preserved => "preserved",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Active => 0,
            Self::Stage => 1,
            Self::Preserved => 2,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|partition| partition.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::ValidationError(format!("unknown user partition `{s}`")))
    }
}

/// Search bases derived once from the directory base DN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionBases {
    users: [DistinguishedName; 3],
    groups: DistinguishedName,
}

impl PartitionBases {
    /// Prefixes each partition template onto `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDn`] if a combined DN does not parse.
    pub fn from_base(base: &DistinguishedName) -> Result<Self> {
        Ok(Self {
            users: [
                base.child(Partition::Active.template())?,
                base.child(Partition::Stage.template())?,
                base.child(Partition::Preserved.template())?,
            ],
            groups: base.child(GROUPS_TEMPLATE)?,
        })
    }

    /// Base DN of a user partition.
    #[must_use]
    pub const fn users(&self, partition: Partition) -> &DistinguishedName {
        &self.users[partition.slot()]
    }

    /// Base DN of the group container.
    #[must_use]
    pub const fn groups(&self) -> &DistinguishedName {
        &self.groups
    }
}

/// State of a lazily fetched value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheSlot<T> {
    /// No fetch has been attempted.
    #[default]
    NotFetched,
    /// The fetch succeeded.
    Fetched(T),
    /// The last fetch attempt failed.
    FetchFailed,
}

impl<T> CacheSlot<T> {
    /// Returns the cached value if the fetch succeeded.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Fetched(value) => Some(value),
            Self::NotFetched | Self::FetchFailed => None,
        }
    }

    /// True if no fetch has been attempted.
    #[must_use]
    pub const fn is_not_fetched(&self) -> bool {
        matches!(self, Self::NotFetched)
    }

    /// True if a fetch succeeded.
    #[must_use]
    pub const fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }

    /// True if the last fetch attempt failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::FetchFailed)
    }
}

/// Keyed entries in the order the directory first returned each key.
///
/// Re-inserting an existing key replaces the value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMap<T> {
    entries: Vec<T>,
    index: BTreeMap<String, usize>,
}

/// Users of one partition keyed by uid.
pub type UserMap = EntryMap<UserEntry>;

/// Groups keyed by name.
pub type GroupMap = EntryMap<GroupEntry>;

pub(crate) static EMPTY_USERS: UserMap = EntryMap::new();
pub(crate) static EMPTY_GROUPS: GroupMap = EntryMap::new();

impl<T> EntryMap<T> {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: String, value: T) -> Option<T> {
        if let Some(&position) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[position], value));
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(value);
        None
    }

    /// Looks up an entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&position| &self.entries[position])
    }

    /// True if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in directory order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

impl<T> Default for EntryMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a EntryMap<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<UserEntry> for UserMap {
    fn from_iter<I: IntoIterator<Item = UserEntry>>(iter: I) -> Self {
        let mut map = Self::new();
        for user in iter {
            map.insert(user.uid().to_string(), user);
        }
        map
    }
}

impl FromIterator<GroupEntry> for GroupMap {
    fn from_iter<I: IntoIterator<Item = GroupEntry>>(iter: I) -> Self {
        let mut map = Self::new();
        for group in iter {
            map.insert(group.name.clone(), group);
        }
        map
    }
}

/// One cache slot per partition.
#[derive(Debug, Default)]
pub(crate) struct PartitionCache {
    slots: [CacheSlot<UserMap>; 3],
}

impl PartitionCache {
    pub(crate) const fn slot(&self, partition: Partition) -> &CacheSlot<UserMap> {
        &self.slots[partition.slot()]
    }

    pub(crate) fn set(&mut self, partition: Partition, slot: CacheSlot<UserMap>) {
        self.slots[partition.slot()] = slot;
    }

    /// Cached users; failed and pending partitions read as empty.
    pub(crate) fn users(&self, partition: Partition) -> &UserMap {
        self.slot(partition).value().unwrap_or(&EMPTY_USERS)
    }
}
