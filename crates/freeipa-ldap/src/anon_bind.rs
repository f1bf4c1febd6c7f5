//! Anonymous-bind policy as reported by `cn=config`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `cn=config` attribute holding the anonymous access policy.
pub const ANON_ACCESS_ATTRIBUTE: &str = "nsslapd-allow-anonymous-access";

/// Whether unauthenticated clients may query the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonBindPolicy {
    /// Anonymous binds are allowed.
    On,
    /// Anonymous binds are refused.
    Off,
    /// Anonymous clients may only read the root DSE.
    RootDse,
    /// The attribute was missing or held an unrecognised value.
    Unknown,
}

impl AnonBindPolicy {
    /// Maps the raw attribute value. Matching is exact, as the server writes these lower-case.
    #[must_use]
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("on") => Self::On,
            Some("off") => Self::Off,
            Some("rootdse") => Self::RootDse,
            _ => Self::Unknown,
        }
    }

    /// Attribute-style spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::RootDse => "rootdse",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AnonBindPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
