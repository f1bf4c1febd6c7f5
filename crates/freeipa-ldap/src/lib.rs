//! LDAP client for FreeIPA / 389 Directory Server.
//!
//! [`IpaServer`] binds once, discovers the server's host name, address and base DN from
//! `cn=config`, and serves user lookups from per-partition caches filled on first access.
//! Transport, name resolution and event reporting sit behind traits so they can be replaced.

#![deny(missing_docs)]

mod anon_bind;
mod config;
mod dn;
mod group;
mod identity;
mod observer;
mod partition;
mod query;
mod server;
mod transport;
mod user;

pub use anon_bind::{AnonBindPolicy, ANON_ACCESS_ATTRIBUTE};
pub use config::{ServerConfig, DEFAULT_TIMEOUT_SECS};
pub use dn::{DistinguishedName, DistinguishedNameError};
pub use group::GroupEntry;
pub use identity::{
    HostResolver, ServerIdentity, SystemResolver, LOCALHOST_ATTRIBUTE, NAMING_CONTEXT_ATTRIBUTE,
};
pub use observer::{DirectoryObserver, TracingObserver};
pub use partition::{
    CacheSlot, EntryMap, GroupMap, Partition, PartitionBases, UserMap, GROUPS_TEMPLATE,
};
pub use query::CONFIG_DN;
pub use server::{EmailMatch, IpaServer, IpaServerBuilder};
pub use transport::{
    decode_lossy, LdapConnector, LdapEntry, LdapSession, RealLdapConnector, SearchScope,
    ALL_ATTRIBUTES, MATCH_ALL_FILTER,
};
pub use user::{UserEntry, MAIL_ATTRIBUTE, UID_ATTRIBUTE};

pub use freeipa_core::{BindCredentials, Error};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = freeipa_core::Result<T>;
