//! FreeIPA server handle.

use crate::{
    anon_bind::{AnonBindPolicy, ANON_ACCESS_ATTRIBUTE},
    config::ServerConfig,
    dn::DistinguishedName,
    group::GroupEntry,
    identity::{HostResolver, ServerIdentity, SystemResolver},
    observer::{DirectoryObserver, TracingObserver},
    partition::{
        CacheSlot, GroupMap, Partition, PartitionBases, PartitionCache, UserMap, EMPTY_GROUPS,
    },
    query::{list_children, read_config_attribute},
    transport::{LdapConnector, LdapEntry, LdapSession, RealLdapConnector},
    user::UserEntry,
    Result,
};
use freeipa_core::Error;
use std::net::IpAddr;
use std::sync::Arc;

/// Result of an email lookup, shaped by the number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailMatch<'a> {
    /// No user matched.
    None,
    /// Exactly one user matched.
    One(&'a UserEntry),
    /// Several users matched, in directory order.
    Many(Vec<&'a UserEntry>),
}

impl<'a> EmailMatch<'a> {
    fn from_matches(mut matches: Vec<&'a UserEntry>) -> Self {
        match matches.len() {
            0 => Self::None,
            1 => Self::One(matches.remove(0)),
            _ => Self::Many(matches),
        }
    }

    /// True when nothing matched.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Number of matching users.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Many(users) => users.len(),
        }
    }

    /// Flattens the result into a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<&'a UserEntry> {
        match self {
            Self::None => Vec::new(),
            Self::One(user) => vec![user],
            Self::Many(users) => users,
        }
    }
}

/// Builder wiring a [`ServerConfig`] to its collaborators.
pub struct IpaServerBuilder {
    config: Arc<ServerConfig>,
    connector: Option<Box<dyn LdapConnector>>,
    resolver: Option<Box<dyn HostResolver>>,
    observer: Option<Arc<dyn DirectoryObserver>>,
}

impl IpaServerBuilder {
    /// Replaces the `ldap3` transport.
    #[must_use]
    pub fn connector(mut self, connector: Box<dyn LdapConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replaces the system host resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: Box<dyn HostResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replaces the default [`TracingObserver`].
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn DirectoryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Connects, binds and discovers the server identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] or [`Error::ConfigError`] if the configuration does not
    /// pass [`ServerConfig::check`], and a connection-class error ([`Error::ConnectionFailed`],
    /// [`Error::BindFailed`] or [`Error::Timeout`]) if the session cannot be opened and
    /// authenticated. Discovery problems are not errors; the affected identity fields are left
    /// empty.
    pub async fn connect(self) -> Result<IpaServer> {
        let config = self.config;
        config.check()?;
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver));
        let connector = self
            .connector
            .unwrap_or_else(|| Box::new(RealLdapConnector::new(config.clone())));
        let resolver = self.resolver.unwrap_or_else(|| Box::new(SystemResolver));

        let url = config.url();
        let mut session = match open_session(&*connector, &config).await {
            Ok(session) => session,
            Err(err) => {
                observer.connect_failed(&url, &err);
                return Err(err);
            }
        };
        observer.connected(&url, config.protocol());

        let identity = ServerIdentity::discover(&mut *session, &*resolver, &*observer).await;
        let bases = identity
            .base_dn()
            .and_then(|base| match PartitionBases::from_base(base) {
                Ok(bases) => Some(bases),
                Err(err) => {
                    observer.discovery_degraded("partition_bases", &err.to_string());
                    None
                }
            });

        Ok(IpaServer {
            config,
            session,
            observer,
            identity,
            bases,
            users: PartitionCache::default(),
            groups: CacheSlot::NotFetched,
            anon_bind: CacheSlot::NotFetched,
        })
    }
}

async fn open_session(
    connector: &dyn LdapConnector,
    config: &ServerConfig,
) -> Result<Box<dyn LdapSession>> {
    let mut session = connector.connect().await?;
    let credentials = config.credentials();
    session
        .simple_bind(credentials.bind_dn(), credentials.bind_password())
        .await?;
    Ok(session)
}

/// An authenticated session with a FreeIPA server plus its lazily filled caches.
///
/// Operations take `&mut self` and run one directory round trip at a time over a single session.
/// The handle has no internal locking; wrap it in a mutex to share it.
pub struct IpaServer {
    config: Arc<ServerConfig>,
    session: Box<dyn LdapSession>,
    observer: Arc<dyn DirectoryObserver>,
    identity: ServerIdentity,
    bases: Option<PartitionBases>,
    users: PartitionCache,
    groups: CacheSlot<GroupMap>,
    anon_bind: CacheSlot<AnonBindPolicy>,
}

impl IpaServer {
    /// Connects with the `ldap3` transport, the system resolver and `tracing` output.
    ///
    /// # Errors
    ///
    /// See [`IpaServerBuilder::connect`].
    pub async fn connect(config: ServerConfig) -> Result<Self> {
        Self::builder(config).connect().await
    }

    /// Starts a builder for custom collaborators.
    #[must_use]
    pub fn builder(config: ServerConfig) -> IpaServerBuilder {
        IpaServerBuilder {
            config: Arc::new(config),
            connector: None,
            resolver: None,
            observer: None,
        }
    }

    /// Connection configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// LDAP URL of the server.
    #[must_use]
    pub fn url(&self) -> String {
        self.config.url()
    }

    /// Discovered identity.
    #[must_use]
    pub const fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    /// Fully qualified host name reported by the server.
    #[must_use]
    pub fn fqdn(&self) -> Option<&str> {
        self.identity.fqdn()
    }

    /// Short host name.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.identity.hostname()
    }

    /// DNS domain.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.identity.domain()
    }

    /// Resolved address.
    #[must_use]
    pub const fn ip(&self) -> Option<IpAddr> {
        self.identity.ip()
    }

    /// Directory base DN.
    #[must_use]
    pub const fn base_dn(&self) -> Option<&DistinguishedName> {
        self.identity.base_dn()
    }

    /// Partition search bases, absent when the base DN was not discovered.
    #[must_use]
    pub const fn partition_bases(&self) -> Option<&PartitionBases> {
        self.bases.as_ref()
    }

    /// Users of `partition`, fetched on first access.
    ///
    /// A failed first fetch is remembered: the partition reads as empty from then on. Use
    /// [`IpaServer::refresh_users`] to query again.
    pub async fn users(&mut self, partition: Partition) -> &UserMap {
        if self.users.slot(partition).is_not_fetched() {
            let slot = match self.fetch_users(partition).await {
                Ok(users) => CacheSlot::Fetched(users),
                Err(_) => CacheSlot::FetchFailed,
            };
            self.users.set(partition, slot);
        }
        self.users.users(partition)
    }

    /// Re-queries `partition` regardless of what is cached.
    ///
    /// # Errors
    ///
    /// Returns the search error; the previously cached state is kept.
    pub async fn refresh_users(&mut self, partition: Partition) -> Result<&UserMap> {
        let users = self.fetch_users(partition).await?;
        self.users.set(partition, CacheSlot::Fetched(users));
        Ok(self.users.users(partition))
    }

    /// Cache state of `partition`, without fetching.
    #[must_use]
    pub const fn user_cache_state(&self, partition: Partition) -> &CacheSlot<UserMap> {
        self.users.slot(partition)
    }

    /// Looks up a user by uid.
    pub async fn user(&mut self, uid: &str, partition: Partition) -> Option<&UserEntry> {
        self.users(partition).await.get(uid)
    }

    /// Users whose email addresses contain `email`.
    pub async fn find_user_by_email(&mut self, email: &str, partition: Partition) -> EmailMatch<'_> {
        let matches = self
            .users(partition)
            .await
            .iter()
            .filter(|user| user.has_email_containing(email))
            .collect();
        EmailMatch::from_matches(matches)
    }

    /// [`IpaServer::find_user_by_email`] over active users.
    pub async fn find_active_user_by_email(&mut self, email: &str) -> EmailMatch<'_> {
        self.find_user_by_email(email, Partition::Active).await
    }

    /// Number of distinct uids in `partition`.
    pub async fn count_users(&mut self, partition: Partition) -> usize {
        self.users(partition).await.len()
    }

    /// Groups, fetched on first access with the same failure semantics as [`IpaServer::users`].
    pub async fn groups(&mut self) -> &GroupMap {
        if self.groups.is_not_fetched() {
            self.groups = match self.fetch_groups().await {
                Ok(groups) => CacheSlot::Fetched(groups),
                Err(_) => CacheSlot::FetchFailed,
            };
        }
        self.groups.value().unwrap_or(&EMPTY_GROUPS)
    }

    /// Re-queries the group collection regardless of what is cached.
    ///
    /// # Errors
    ///
    /// Returns the search error; the previously cached state is kept.
    pub async fn refresh_groups(&mut self) -> Result<&GroupMap> {
        let groups = self.fetch_groups().await?;
        self.groups = CacheSlot::Fetched(groups);
        Ok(self.groups.value().unwrap_or(&EMPTY_GROUPS))
    }

    /// Cache state of the group collection, without fetching.
    #[must_use]
    pub const fn group_cache_state(&self) -> &CacheSlot<GroupMap> {
        &self.groups
    }

    /// Looks up a group by name.
    pub async fn group(&mut self, name: &str) -> Option<&GroupEntry> {
        self.groups().await.get(name)
    }

    /// Number of groups.
    pub async fn count_groups(&mut self) -> usize {
        self.groups().await.len()
    }

    /// Anonymous-bind policy, queried on first access.
    ///
    /// Returns `None` when the query fails; the next call queries again.
    pub async fn anon_bind(&mut self) -> Option<AnonBindPolicy> {
        if let CacheSlot::Fetched(policy) = self.anon_bind {
            return Some(policy);
        }

        match read_config_attribute(&mut *self.session, &*self.observer, ANON_ACCESS_ATTRIBUTE).await
        {
            Ok(value) => {
                let policy = AnonBindPolicy::from_attribute(value.as_deref());
                self.observer.anon_bind_resolved(policy);
                self.anon_bind = CacheSlot::Fetched(policy);
                Some(policy)
            }
            Err(_) => {
                self.anon_bind = CacheSlot::FetchFailed;
                None
            }
        }
    }

    /// Cache state of the anonymous-bind policy, without querying.
    #[must_use]
    pub const fn anon_bind_state(&self) -> &CacheSlot<AnonBindPolicy> {
        &self.anon_bind
    }

    /// Unbinds and closes the session.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the unbind request fails.
    pub async fn close(mut self) -> Result<()> {
        self.session.unbind().await
    }

    async fn fetch_users(&mut self, partition: Partition) -> Result<UserMap> {
        let base = self.bases.as_ref().map(|bases| bases.users(partition).clone());
        let entries = self.search_children(base).await?;

        let mut users = UserMap::new();
        for entry in &entries {
            match UserEntry::from_ldap_entry(entry) {
                Some(user) => {
                    users.insert(user.uid().to_string(), user);
                }
                None => self.observer.entry_skipped(&entry.dn, "no uid attribute"),
            }
        }
        self.observer.users_loaded(partition, users.len());
        Ok(users)
    }

    async fn fetch_groups(&mut self) -> Result<GroupMap> {
        let base = self.bases.as_ref().map(|bases| bases.groups().clone());
        let entries = self.search_children(base).await?;

        let mut groups = GroupMap::new();
        for entry in &entries {
            match GroupEntry::from_ldap_entry(entry) {
                Some(group) => {
                    groups.insert(group.name.clone(), group);
                }
                None => self.observer.entry_skipped(&entry.dn, "no cn attribute"),
            }
        }
        self.observer.groups_loaded(groups.len());
        Ok(groups)
    }

    /// Lists the entries directly below `base`; anything else the server returns is skipped.
    async fn search_children(
        &mut self,
        base: Option<DistinguishedName>,
    ) -> Result<Vec<LdapEntry>> {
        let Some(base) = base else {
            let err = Error::NotResolved("base DN was not discovered".to_string());
            self.observer.search_failed(&err);
            return Err(err);
        };
        let entries = list_children(&mut *self.session, &*self.observer, base.as_str()).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| is_direct_child(entry, &base, &*self.observer))
            .collect())
    }
}

fn is_direct_child(
    entry: &LdapEntry,
    base: &DistinguishedName,
    observer: &dyn DirectoryObserver,
) -> bool {
    match DistinguishedName::parse(&entry.dn) {
        Ok(dn) if dn.is_child_of(base) => true,
        Ok(_) => {
            observer.entry_skipped(&entry.dn, &format!("not directly below `{base}`"));
            false
        }
        Err(err) => {
            observer.entry_skipped(&entry.dn, &format!("invalid DN: {err}"));
            false
        }
    }
}
