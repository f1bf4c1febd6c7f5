//! Shared search plumbing: failures are reported to the observer before being returned.

use crate::{
    observer::DirectoryObserver,
    transport::{LdapEntry, LdapSession, SearchScope, ALL_ATTRIBUTES, MATCH_ALL_FILTER},
    Result,
};

/// Server configuration node queried during discovery.
pub const CONFIG_DN: &str = "cn=config";

/// Reads the first value of a single attribute on `cn=config`.
///
/// `Ok(None)` means the search succeeded but the attribute was absent.
pub(crate) async fn read_config_attribute(
    session: &mut dyn LdapSession,
    observer: &dyn DirectoryObserver,
    attribute: &'static str,
) -> Result<Option<String>> {
    let entries = session
        .search(CONFIG_DN, SearchScope::Base, MATCH_ALL_FILTER, &[attribute])
        .await
        .inspect_err(|err| observer.search_failed(err))?;

    Ok(entries
        .first()
        .and_then(|entry| entry.first_lossy(attribute)))
}

/// Lists every entry exactly one level below `base`, with all attributes.
pub(crate) async fn list_children(
    session: &mut dyn LdapSession,
    observer: &dyn DirectoryObserver,
    base: &str,
) -> Result<Vec<LdapEntry>> {
    session
        .search(base, SearchScope::OneLevel, MATCH_ALL_FILTER, ALL_ATTRIBUTES)
        .await
        .inspect_err(|err| observer.search_failed(err))
}
