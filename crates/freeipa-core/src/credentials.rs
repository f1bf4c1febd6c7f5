//! Bind credentials for directory authentication.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Default bind identity, the 389 Directory Server superuser.
pub const DEFAULT_BIND_DN: &str = "cn=Directory Manager";

/// Simple-bind credentials.
///
/// The password is held in a [`SecretString`] so it never shows up in `Debug` output or logs.
#[derive(Debug, Clone, Deserialize)]
pub struct BindCredentials {
    /// Bind DN (e.g. `cn=Directory Manager` or `uid=admin,cn=users,cn=accounts,dc=example,dc=com`)
    #[serde(default = "default_bind_dn")]
    pub bind_dn: String,

    /// Bind password
    #[serde(default)]
    pub bind_password: SecretString,
}

fn default_bind_dn() -> String {
    DEFAULT_BIND_DN.to_string()
}

impl BindCredentials {
    /// Create new bind credentials.
    ///
    /// # Arguments
    ///
    /// * `bind_dn` - The DN to bind as
    /// * `bind_password` - The password for `bind_dn`
    #[must_use]
    pub fn new(bind_dn: impl Into<String>, bind_password: impl Into<String>) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            bind_password: SecretString::from(bind_password.into()),
        }
    }

    /// Credentials for the directory manager with the given password.
    #[must_use]
    pub fn directory_manager(bind_password: impl Into<String>) -> Self {
        Self::new(DEFAULT_BIND_DN, bind_password)
    }

    /// Get the LDAP bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Get the LDAP bind password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.bind_password.expose_secret()
    }
}

impl Default for BindCredentials {
    fn default() -> Self {
        Self::directory_manager("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_as_directory_manager() {
        let creds = BindCredentials::default();
        assert_eq!(creds.bind_dn(), "cn=Directory Manager");
        assert_eq!(creds.bind_password(), "");
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = BindCredentials::directory_manager("hunter2");
        assert_eq!(creds.bind_password(), "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn deserialize_fills_defaults() {
        let creds: BindCredentials = serde_json::from_str(r#"{"bind_password":"s3cret"}"#).unwrap();
        assert_eq!(creds.bind_dn(), DEFAULT_BIND_DN);
        assert_eq!(creds.bind_password(), "s3cret");

        let creds: BindCredentials = serde_json::from_str(
            r#"{"bind_dn":"uid=admin,cn=users,cn=accounts,dc=example,dc=com"}"#,
        )
        .unwrap();
        assert_eq!(
            creds.bind_dn(),
            "uid=admin,cn=users,cn=accounts,dc=example,dc=com"
        );
        assert_eq!(creds.bind_password(), "");
    }
}
