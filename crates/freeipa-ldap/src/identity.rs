//! Server identity discovery.

use crate::{
    dn::DistinguishedName, observer::DirectoryObserver, query::read_config_attribute,
    transport::LdapSession,
};
use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::net::IpAddr;

/// `cn=config` attribute holding the server's fully qualified host name.
pub const LOCALHOST_ATTRIBUTE: &str = "nsslapd-localhost";

/// `cn=config` attribute holding the default naming context (the base DN).
pub const NAMING_CONTEXT_ATTRIBUTE: &str = "nsslapd-defaultnamingcontext";

/// Resolves host names to addresses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Returns every address `host` resolves to.
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// What the server reports about itself.
///
/// Every field is optional: a failed or empty discovery query leaves the field, and anything
/// derived from it, absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerIdentity {
    fqdn: Option<String>,
    hostname: Option<String>,
    domain: Option<String>,
    ip: Option<IpAddr>,
    base_dn: Option<DistinguishedName>,
}

impl ServerIdentity {
    /// Queries `cn=config` for the host name and base DN and resolves the host's address.
    pub(crate) async fn discover(
        session: &mut dyn LdapSession,
        resolver: &dyn HostResolver,
        observer: &dyn DirectoryObserver,
    ) -> Self {
        let fqdn = read_config_value(session, observer, "fqdn", LOCALHOST_ATTRIBUTE).await;
        let (hostname, domain) = fqdn.as_deref().map(split_fqdn).unzip();

        let ip = match fqdn.as_deref() {
            Some(fqdn) => resolve_address(resolver, observer, fqdn).await,
            None => None,
        };

        let base_dn = read_config_value(session, observer, "base_dn", NAMING_CONTEXT_ATTRIBUTE)
            .await
            .and_then(|raw| match DistinguishedName::parse(&raw) {
                Ok(dn) => Some(dn),
                Err(err) => {
                    observer.discovery_degraded("base_dn", &format!("`{raw}`: {err}"));
                    None
                }
            });

        let identity = Self {
            fqdn,
            hostname,
            domain,
            ip,
            base_dn,
        };
        observer.identity_resolved(&identity);
        identity
    }

    /// Fully qualified host name reported by the server.
    #[must_use]
    pub fn fqdn(&self) -> Option<&str> {
        self.fqdn.as_deref()
    }

    /// First label of the FQDN.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// FQDN without its first label; empty when the FQDN has no dot.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Address the FQDN resolved to.
    #[must_use]
    pub const fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// Directory base DN.
    #[must_use]
    pub const fn base_dn(&self) -> Option<&DistinguishedName> {
        self.base_dn.as_ref()
    }
}

async fn read_config_value(
    session: &mut dyn LdapSession,
    observer: &dyn DirectoryObserver,
    field: &'static str,
    attribute: &'static str,
) -> Option<String> {
    match read_config_attribute(session, observer, attribute).await {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            observer.discovery_degraded(field, &format!("`{attribute}` not present on cn=config"));
            None
        }
        // Already reported by the search plumbing.
        Err(_) => None,
    }
}

async fn resolve_address(
    resolver: &dyn HostResolver,
    observer: &dyn DirectoryObserver,
    fqdn: &str,
) -> Option<IpAddr> {
    match resolver.resolve(fqdn).await {
        Ok(addrs) => {
            let ip = preferred_address(&addrs);
            if ip.is_none() {
                observer.discovery_degraded("ip", &format!("`{fqdn}` has no addresses"));
            }
            ip
        }
        Err(err) => {
            observer.discovery_degraded("ip", &format!("cannot resolve `{fqdn}`: {err}"));
            None
        }
    }
}

/// Splits on the first dot: `ipa.example.com` becomes (`ipa`, `example.com`).
pub(crate) fn split_fqdn(fqdn: &str) -> (String, String) {
    match fqdn.split_once('.') {
        Some((host, domain)) => (host.to_string(), domain.to_string()),
        None => (fqdn.to_string(), String::new()),
    }
}

/// First IPv4 address, falling back to the first address of any family.
pub(crate) fn preferred_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
