//! Distinguished name handling for FreeIPA entries and search bases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use freeipa_core::Error as CoreError;

/// Errors that can occur when parsing distinguished names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component had no `=` separator or was blank.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the attribute name to the left of the `=`.
    #[error("distinguished name component missing attribute: {0}")]
    MissingAttribute(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::InvalidDn(err.to_string())
    }
}

/// A single `attribute=value` component with its value unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RelativeDistinguishedName {
    attribute: String,
    value: String,
}

impl RelativeDistinguishedName {
    fn matches(&self, other: &Self) -> bool {
        self.attribute.eq_ignore_ascii_case(&other.attribute)
            && self.value.eq_ignore_ascii_case(&other.value)
    }
}

/// Distinguished name that keeps the server-provided text verbatim.
///
/// The textual form is never re-rendered, so a DN built by prefixing RDNs onto a base is the
/// exact concatenation of the two strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<RelativeDistinguishedName>,
}

impl DistinguishedName {
    /// Parses a distinguished name.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the input is empty or a component is malformed.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, DistinguishedNameError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DistinguishedNameError::Empty);
        }

        let rdns = split_unescaped(raw, ',')?
            .into_iter()
            .map(parse_component)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            rdns,
        })
    }

    /// Borrows the distinguished name text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Builds the DN `"{rdns},{self}"`.
    ///
    /// # Errors
    ///
    /// Returns an error if `rdns` is not a valid sequence of components.
    pub fn child(&self, rdns: &str) -> Result<Self, DistinguishedNameError> {
        Self::parse(format!("{},{}", rdns.trim(), self.raw))
    }

    /// Returns true if `self` lies strictly below `ancestor`. Components compare
    /// case-insensitively after unescaping.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.rdns.len() > ancestor.rdns.len()
            && self
                .rdns
                .iter()
                .rev()
                .zip(ancestor.rdns.iter().rev())
                .all(|(ours, theirs)| ours.matches(theirs))
    }

    /// Returns true if `self` sits exactly one level below `parent`.
    #[must_use]
    pub fn is_child_of(&self, parent: &Self) -> bool {
        self.rdns.len() == parent.rdns.len() + 1 && self.is_descendant_of(parent)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DistinguishedNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

impl TryFrom<String> for DistinguishedName {
    type Error = DistinguishedNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for DistinguishedName {
    type Error = DistinguishedNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Splits on `delimiter` outside escape sequences. Parts keep their escapes.
fn split_unescaped(input: &str, delimiter: char) -> Result<Vec<&str>, DistinguishedNameError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escape = false;

    for (i, ch) in input.char_indices() {
        if escape {
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == delimiter {
            parts.push(input[start..i].trim());
            start = i + ch.len_utf8();
        }
    }

    if escape {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }
    parts.push(input[start..].trim());

    if let Some(blank) = parts.iter().find(|part| part.is_empty()) {
        return Err(DistinguishedNameError::InvalidComponent(
            (*blank).to_string(),
        ));
    }
    Ok(parts)
}

fn split_first_unescaped(input: &str, delimiter: char) -> Option<(&str, &str)> {
    let mut escape = false;
    for (i, ch) in input.char_indices() {
        if escape {
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == delimiter {
            return Some((&input[..i], &input[i + ch.len_utf8()..]));
        }
    }
    None
}

fn parse_component(component: &str) -> Result<RelativeDistinguishedName, DistinguishedNameError> {
    let (attribute, value) = split_first_unescaped(component, '=')
        .ok_or_else(|| DistinguishedNameError::InvalidComponent(component.to_string()))?;
    let attribute = attribute.trim();
    let value = value.trim();

    if attribute.is_empty() {
        return Err(DistinguishedNameError::MissingAttribute(
            component.to_string(),
        ));
    }
    if value.is_empty() {
        return Err(DistinguishedNameError::MissingValue(attribute.to_string()));
    }

    Ok(RelativeDistinguishedName {
        attribute: attribute.to_string(),
        value: unescape(value),
    })
}

fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(ch);
        }
    }
    result
}
