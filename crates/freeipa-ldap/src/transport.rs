//! LDAP transport seam and its `ldap3` implementation.

use crate::{config::ServerConfig, Result};
use async_trait::async_trait;
use freeipa_core::Error;
use ldap3::{LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use native_tls::{Certificate, TlsConnector};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Filter matching every entry.
pub const MATCH_ALL_FILTER: &str = "(objectClass=*)";

/// Attribute selector requesting all user attributes.
pub const ALL_ATTRIBUTES: &[&str] = &["*"];

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// Raw entry returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attributes whose values decoded as UTF-8, in server order.
    pub attributes: HashMap<String, Vec<String>>,
    /// Attributes with at least one value that is not valid UTF-8.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdapEntry {
    /// Creates an entry with no attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// Adds textual values for `attribute`.
    #[must_use]
    pub fn with_attribute<I, V>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes
            .insert(attribute.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Adds raw byte values for `attribute`.
    #[must_use]
    pub fn with_binary_attribute(mut self, attribute: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        self.binary_attributes.insert(attribute.into(), values);
        self
    }

    /// Returns all textual values for the attribute (name matched case-insensitively).
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the first textual value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns the first value of the attribute, dropping any bytes that are not valid UTF-8.
    #[must_use]
    pub fn first_lossy(&self, attribute: &str) -> Option<String> {
        if let Some(value) = self.first(attribute) {
            return Some(value.to_string());
        }
        self.binary_attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .and_then(|(_, values)| values.first())
            .map(|bytes| decode_lossy(bytes))
    }

    /// Every attribute decoded to text, binary values included. Names are lower-cased.
    #[must_use]
    pub fn decoded_attributes(&self) -> HashMap<String, Vec<String>> {
        let mut decoded: HashMap<String, Vec<String>> = HashMap::new();
        for (name, values) in &self.attributes {
            decoded
                .entry(name.to_ascii_lowercase())
                .or_default()
                .extend(values.iter().cloned());
        }
        for (name, values) in &self.binary_attributes {
            decoded
                .entry(name.to_ascii_lowercase())
                .or_default()
                .extend(values.iter().map(|bytes| decode_lossy(bytes)));
        }
        decoded
    }
}

/// Decodes UTF-8, skipping invalid byte sequences instead of failing.
#[must_use]
pub fn decode_lossy(mut bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                decoded.push_str(valid);
                return decoded;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                decoded.push_str(std::str::from_utf8(valid).unwrap_or_default());
                bytes = &rest[err.error_len().unwrap_or(rest.len())..];
            }
        }
    }
}

/// An open directory session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapSession: Send {
    /// Performs a simple bind.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;

    /// Executes a search and returns every matching entry.
    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>>;

    /// Closes the session.
    async fn unbind(&mut self) -> Result<()>;
}

/// Opens sessions against a directory server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapConnector: Send + Sync {
    /// Opens an unauthenticated session.
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    config: Arc<ServerConfig>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let url = self.config.url();
        let settings = build_ldap_settings(&self.config)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|err| connect_error(&url, err))?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            bind_timeout: self.config.timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    bind_timeout: Duration,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        timeout(self.bind_timeout, self.inner.simple_bind(dn, password))
            .await
            .map_err(|_| Error::Timeout(format!("bind as `{dn}` timed out")))?
            .and_then(ldap3::LdapResult::success)
            .map_err(|err| Error::BindFailed(err.to_string()))?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        let (entries, _) = self
            .inner
            .search(base_dn, scope.into(), filter, attributes.to_vec())
            .await
            .and_then(ldap3::SearchResult::success)
            .map_err(|err| Error::search_failed(base_dn, err.to_string()))?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| LdapEntry {
                dn: entry.dn,
                attributes: entry.attrs,
                binary_attributes: entry.bin_attrs,
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.inner
            .unbind()
            .await
            .map_err(|err| Error::ConnectionFailed(err.to_string()))
    }
}

/// Maps a failed connection attempt; the `set_conn_timeout` expiry becomes [`Error::Timeout`].
fn connect_error(url: &str, err: LdapError) -> Error {
    match err {
        LdapError::Timeout { .. } => Error::Timeout(format!("connecting to {url} timed out")),
        other => Error::ConnectionFailed(format!("{url}: {other}")),
    }
}

fn build_ldap_settings(config: &ServerConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.timeout());
    if !config.tls() {
        return Ok(settings);
    }

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::ConfigError(format!("failed to load CA certificate: {err}")))?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}
