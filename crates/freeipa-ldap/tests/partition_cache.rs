//! Integration tests running the public API against an in-memory directory.
//!
//! The directory contents come from `tests/fixtures/directory.json`, shaped like a small
//! FreeIPA deployment.

use async_trait::async_trait;
use freeipa_ldap::{
    AnonBindPolicy, BindCredentials, DirectoryObserver, EmailMatch, Error, HostResolver,
    IpaServer, LdapConnector, LdapEntry, LdapSession, Partition, Result, SearchScope,
    ServerConfig, CONFIG_DN,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const PASSWORD: &str = "Secret123";

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    dn: String,
    attributes: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Directory {
    config: HashMap<String, String>,
    children: HashMap<String, Vec<FixtureEntry>>,
}

/// Load the directory fixture from disk.
fn load_directory() -> Directory {
    let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("directory.json");
    let json = fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read directory fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });
    serde_json::from_str(&json).unwrap_or_else(|e| panic!("Failed to parse directory fixture: {e}"))
}

struct InMemoryConnector {
    directory: Arc<Directory>,
    searches: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LdapConnector for InMemoryConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        Ok(Box::new(InMemorySession {
            directory: self.directory.clone(),
            searches: self.searches.clone(),
        }))
    }
}

struct InMemorySession {
    directory: Arc<Directory>,
    searches: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LdapSession for InMemorySession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        if dn == "cn=Directory Manager" && password == PASSWORD {
            Ok(())
        } else {
            Err(Error::BindFailed("Invalid credentials".to_string()))
        }
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        _filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        self.searches.lock().unwrap().push(base_dn.to_string());

        if base_dn == CONFIG_DN && scope == SearchScope::Base {
            let mut entry = LdapEntry::new(CONFIG_DN);
            for attribute in attributes {
                if let Some(value) = self.directory.config.get(*attribute) {
                    entry = entry.with_attribute(*attribute, [value.as_str()]);
                }
            }
            return Ok(vec![entry]);
        }

        let children = self
            .directory
            .children
            .get(base_dn)
            .ok_or_else(|| Error::search_failed(base_dn, "No such object"))?;
        Ok(children
            .iter()
            .map(|child| {
                child
                    .attributes
                    .iter()
                    .fold(LdapEntry::new(child.dn.as_str()), |entry, (name, values)| {
                        entry.with_attribute(name.as_str(), values.iter().map(String::as_str))
                    })
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        Ok(())
    }
}

struct StaticResolver;

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        match host {
            "ipa01.corp.example.net" => Ok(vec![
                IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x10)),
                IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)),
            ]),
            _ => Err(io::Error::new(io::ErrorKind::NotFound, "unknown host")),
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl DirectoryObserver for RecordingObserver {
    fn connected(&self, url: &str, protocol: &str) {
        self.events.lock().unwrap().push(format!("connected {protocol} {url}"));
    }

    fn search_failed(&self, error: &Error) {
        self.events.lock().unwrap().push(format!("search_failed {}", error.error_code()));
    }

    fn entry_skipped(&self, dn: &str, _reason: &str) {
        self.events.lock().unwrap().push(format!("skipped {dn}"));
    }

    fn users_loaded(&self, partition: Partition, count: usize) {
        self.events.lock().unwrap().push(format!("users_loaded {partition} {count}"));
    }
}

struct Harness {
    server: IpaServer,
    searches: Arc<Mutex<Vec<String>>>,
    observer: Arc<RecordingObserver>,
}

impl Harness {
    fn searches_under(&self, base: &str) -> usize {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .filter(|searched| *searched == base)
            .count()
    }
}

fn config(password: &str) -> ServerConfig {
    ServerConfig::new("ipa01.corp.example.net")
        .unwrap()
        .with_credentials(BindCredentials::directory_manager(password))
}

async fn connect(password: &str) -> Result<Harness> {
    let searches = Arc::new(Mutex::new(Vec::new()));
    let observer = Arc::new(RecordingObserver::default());
    let connector = InMemoryConnector {
        directory: Arc::new(load_directory()),
        searches: searches.clone(),
    };

    let server = IpaServer::builder(config(password))
        .connector(Box::new(connector))
        .resolver(Box::new(StaticResolver))
        .observer(observer.clone())
        .connect()
        .await?;

    Ok(Harness {
        server,
        searches,
        observer,
    })
}

#[tokio::test]
async fn test_discovers_server_identity() {
    let harness = connect(PASSWORD).await.unwrap();
    let server = &harness.server;

    assert_eq!(server.url(), "ldaps://ipa01.corp.example.net");
    assert_eq!(server.fqdn(), Some("ipa01.corp.example.net"));
    assert_eq!(server.hostname(), Some("ipa01"));
    assert_eq!(server.domain(), Some("corp.example.net"));
    assert_eq!(server.ip(), Some(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))));
    assert_eq!(
        server.base_dn().map(|dn| dn.as_str()),
        Some("dc=corp,dc=example,dc=net")
    );
    assert_eq!(
        harness.observer.events(),
        ["connected LDAPS ldaps://ipa01.corp.example.net"]
    );
}

#[tokio::test]
async fn test_wrong_password_fails_construction() {
    match connect("wrong").await {
        Err(err) => assert_eq!(err.error_code(), "BIND_FAILED"),
        Ok(_) => panic!("bind with a wrong password must fail"),
    }
}

#[tokio::test]
async fn test_active_users_are_cached_and_searchable() {
    let mut harness = connect(PASSWORD).await.unwrap();
    let active_base = "cn=users,cn=accounts,dc=corp,dc=example,dc=net";

    assert_eq!(harness.server.count_users(Partition::Active).await, 3);

    let admin = harness.server.user("admin", Partition::Active).await.unwrap();
    assert_eq!(admin.display_name().as_deref(), Some("Administrator"));
    assert_eq!(admin.uid_number(), Some(1_549_200_000));
    assert!(admin.mail().is_empty());

    let rquinn = harness.server.user("rquinn", Partition::Active).await.unwrap();
    assert!(rquinn.is_disabled());

    match harness.server.find_active_user_by_email("morgan@example.org").await {
        EmailMatch::One(user) => assert_eq!(user.uid(), "mhale"),
        other => panic!("expected one match, got {other:?}"),
    }

    let uids: Vec<String> = harness
        .server
        .find_active_user_by_email("@corp.example.net")
        .await
        .into_vec()
        .into_iter()
        .map(|user| user.uid().to_string())
        .collect();
    assert_eq!(uids, ["mhale", "rquinn"]);

    assert!(harness
        .server
        .find_active_user_by_email("nobody@example.com")
        .await
        .is_none());

    assert_eq!(harness.searches_under(active_base), 1);
    assert!(harness
        .observer
        .events()
        .contains(&format!("skipped cn=orphan,{active_base}")));
}

#[tokio::test]
async fn test_partitions_are_cached_independently() {
    let mut harness = connect(PASSWORD).await.unwrap();

    assert_eq!(harness.server.count_users(Partition::Stage).await, 1);
    assert!(harness.server.user("admin", Partition::Stage).await.is_none());
    match harness
        .server
        .find_user_by_email("tnew@corp.example.net", Partition::Stage)
        .await
    {
        EmailMatch::One(user) => assert_eq!(user.uid(), "tnew"),
        other => panic!("expected one match, got {other:?}"),
    }
    assert!(harness
        .server
        .user_cache_state(Partition::Active)
        .is_not_fetched());
}

#[tokio::test]
async fn test_missing_partition_reads_as_empty() {
    let mut harness = connect(PASSWORD).await.unwrap();
    let preserved_base = "cn=deleted users,cn=accounts,cn=provisioning,dc=corp,dc=example,dc=net";

    assert_eq!(harness.server.count_users(Partition::Preserved).await, 0);
    assert_eq!(harness.server.count_users(Partition::Preserved).await, 0);
    assert!(harness
        .server
        .user_cache_state(Partition::Preserved)
        .is_failed());
    assert_eq!(harness.searches_under(preserved_base), 1);
    assert!(harness
        .observer
        .events()
        .contains(&"search_failed SEARCH_FAILED".to_string()));

    assert!(harness
        .server
        .refresh_users(Partition::Preserved)
        .await
        .is_err());
    assert_eq!(harness.searches_under(preserved_base), 2);
}

#[tokio::test]
async fn test_groups_and_anon_bind() {
    let mut harness = connect(PASSWORD).await.unwrap();

    assert_eq!(harness.server.count_groups().await, 2);
    let ipausers = harness.server.group("ipausers").await.unwrap();
    assert_eq!(ipausers.member_count(), 2);
    assert!(!ipausers.is_posix());

    assert_eq!(harness.server.anon_bind().await, Some(AnonBindPolicy::RootDse));
    assert_eq!(harness.server.anon_bind().await, Some(AnonBindPolicy::RootDse));
    assert_eq!(harness.searches_under(CONFIG_DN), 3);

    harness.server.close().await.unwrap();
}
