//! FreeIPA user entries.

use crate::transport::LdapEntry;
use serde::Serialize;
use std::collections::HashMap;

/// Attribute used to key user entries.
pub const UID_ATTRIBUTE: &str = "uid";

/// Attribute holding a user's email addresses.
pub const MAIL_ATTRIBUTE: &str = "mail";

/// A decoded user entry.
///
/// Attribute names are stored lower-cased and looked up case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    uid: String,
    dn: String,
    attributes: HashMap<String, Vec<String>>,
}

impl UserEntry {
    /// Builds a user from a raw entry, or `None` when the entry has no `uid`.
    ///
    /// The uid is the first `uid` value with undecodable bytes dropped.
    #[must_use]
    pub fn from_ldap_entry(entry: &LdapEntry) -> Option<Self> {
        let uid = entry.first_lossy(UID_ATTRIBUTE)?;
        Some(Self {
            uid,
            dn: entry.dn.clone(),
            attributes: entry.decoded_attributes(),
        })
    }

    /// Login name.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Distinguished name of the entry.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// All decoded attributes.
    #[must_use]
    pub const fn attributes(&self) -> &HashMap<String, Vec<String>> {
        &self.attributes
    }

    /// Every value of `attribute`; empty when absent.
    #[must_use]
    pub fn values(&self, attribute: &str) -> &[String] {
        self.attributes
            .get(&attribute.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First value of `attribute`.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute).first().map(String::as_str)
    }

    /// Email addresses.
    #[must_use]
    pub fn mail(&self) -> &[String] {
        self.values(MAIL_ATTRIBUTE)
    }

    /// True if any email address contains `needle`. Users without email never match.
    #[must_use]
    pub fn has_email_containing(&self, needle: &str) -> bool {
        self.mail().iter().any(|address| address.contains(needle))
    }

    /// Given name.
    #[must_use]
    pub fn given_name(&self) -> Option<&str> {
        self.first("givenName")
    }

    /// Surname.
    #[must_use]
    pub fn surname(&self) -> Option<&str> {
        self.first("sn")
    }

    /// Preferred display name: `displayName`, then `cn`, then given name and surname.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.first("displayName").or_else(|| self.first("cn")) {
            return Some(name.to_string());
        }

        match (self.given_name(), self.surname()) {
            (Some(given), Some(sn)) => Some(format!("{given} {sn}")),
            (Some(given), None) => Some(given.to_string()),
            (None, Some(sn)) => Some(sn.to_string()),
            _ => None,
        }
    }

    /// POSIX user id.
    #[must_use]
    pub fn uid_number(&self) -> Option<u32> {
        self.first("uidNumber").and_then(|value| value.parse().ok())
    }

    /// POSIX primary group id.
    #[must_use]
    pub fn gid_number(&self) -> Option<u32> {
        self.first("gidNumber").and_then(|value| value.parse().ok())
    }

    /// Home directory.
    #[must_use]
    pub fn home_directory(&self) -> Option<&str> {
        self.first("homeDirectory")
    }

    /// Login shell.
    #[must_use]
    pub fn login_shell(&self) -> Option<&str> {
        self.first("loginShell")
    }

    /// DNs of the groups and roles the user belongs to.
    #[must_use]
    pub fn member_of(&self) -> &[String] {
        self.values("memberOf")
    }

    /// True when `nsAccountLock` is set.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.first("nsAccountLock")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}
