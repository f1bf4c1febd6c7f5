//! Configuration for connecting to a FreeIPA directory server.

use crate::Result;
use freeipa_core::{BindCredentials, Error};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default network timeout (seconds) applied to each connection attempt.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Connection parameters for a FreeIPA server.
///
/// Deserialized configs are checked again by [`crate::IpaServerBuilder::connect`].
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    host: String,

    #[serde(flatten)]
    credentials: BindCredentials,

    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,

    #[serde(default = "default_tls")]
    tls: bool,

    #[serde(default)]
    tls_verify: bool,

    #[serde(default)]
    tls_ca_cert: Option<PathBuf>,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_tls() -> bool {
    true
}

impl ServerConfig {
    /// Creates a configuration for `host` bound as the directory manager with an empty password.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is empty or does not form a valid LDAP URL.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self {
            host: host.into(),
            credentials: BindCredentials::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tls: true,
            tls_verify: false,
            tls_ca_cert: None,
        }
        .validated()
    }

    /// Validates field ranges and the derived URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for out-of-range fields and [`Error::ConfigError`] when
    /// the host cannot be turned into a URL.
    pub fn validated(self) -> Result<Self> {
        self.check()?;
        Ok(self)
    }

    /// Same checks as [`ServerConfig::validated`] without taking ownership.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::validated`].
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Url::parse(&self.url())
            .map_err(|err| Error::ConfigError(format!("invalid host `{}`: {err}", self.host)))?;
        Ok(())
    }

    /// Returns the server host name as configured.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the LDAP URL derived from the host and TLS flag.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.tls { "ldaps" } else { "ldap" };
        format!("{scheme}://{}", self.host)
    }

    /// Short protocol label for log output.
    #[must_use]
    pub const fn protocol(&self) -> &'static str {
        if self.tls {
            "LDAPS"
        } else {
            "LDAP"
        }
    }

    /// Returns the bind credentials.
    #[must_use]
    pub const fn credentials(&self) -> &BindCredentials {
        &self.credentials
    }

    /// Returns the network timeout applied to each connection attempt.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns whether the connection uses LDAPS.
    #[must_use]
    pub const fn tls(&self) -> bool {
        self.tls
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Overrides the bind credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: BindCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Overrides the connection timeout in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] unless `seconds` is within 1..=300.
    pub fn with_timeout_secs(mut self, seconds: u64) -> Result<Self> {
        self.timeout_secs = seconds;
        self.validated()
    }

    /// Switches between LDAPS and plaintext LDAP.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }
}
