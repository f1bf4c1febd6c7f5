//! FreeIPA group entries.

use serde::Serialize;

use crate::transport::LdapEntry;

/// Representation of a group under `cn=groups,cn=accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    /// Group name (the `cn` attribute).
    pub name: String,
    /// Distinguished name of the group.
    pub dn: String,
    /// Optional description.
    pub description: Option<String>,
    /// POSIX group id, absent for non-POSIX groups.
    pub gid_number: Option<u32>,
    /// Direct member DNs (users and nested groups).
    pub members: Vec<String>,
}

impl GroupEntry {
    /// Builds a group from a raw entry, or `None` when the entry has no `cn`.
    #[must_use]
    pub fn from_ldap_entry(entry: &LdapEntry) -> Option<Self> {
        let name = entry.first_lossy("cn")?;
        Some(Self {
            name,
            dn: entry.dn.clone(),
            description: entry.first("description").map(str::to_owned),
            gid_number: entry.first("gidNumber").and_then(|value| value.parse().ok()),
            members: entry.values("member").map(<[String]>::to_vec).unwrap_or_default(),
        })
    }

    /// Returns the number of direct members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Checks whether `member_dn` is a direct member (case-insensitive).
    #[must_use]
    pub fn has_member(&self, member_dn: &str) -> bool {
        self.members
            .iter()
            .any(|dn| dn.eq_ignore_ascii_case(member_dn))
    }

    /// True for groups carrying a `gidNumber`.
    #[must_use]
    pub const fn is_posix(&self) -> bool {
        self.gid_number.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_group_from_entry() {
        let entry = LdapEntry::new("cn=admins,cn=groups,cn=accounts,dc=example,dc=com")
            .with_attribute("cn", ["admins"])
            .with_attribute("description", ["Account administrators group"])
            .with_attribute("gidNumber", ["1200000"])
            .with_attribute(
                "member",
                ["uid=admin,cn=users,cn=accounts,dc=example,dc=com"],
            );

        let group = GroupEntry::from_ldap_entry(&entry).unwrap();
        assert_eq!(group.name, "admins");
        assert_eq!(group.description.as_deref(), Some("Account administrators group"));
        assert!(group.is_posix());
        assert_eq!(group.member_count(), 1);
        assert!(group.has_member("UID=admin,cn=users,cn=accounts,dc=example,dc=com"));
    }

    #[test]
    fn group_without_members() {
        let entry = LdapEntry::new("cn=ipausers,cn=groups,cn=accounts,dc=example,dc=com")
            .with_attribute("cn", ["ipausers"]);
        let group = GroupEntry::from_ldap_entry(&entry).unwrap();
        assert_eq!(group.member_count(), 0);
        assert!(!group.is_posix());
    }
}
