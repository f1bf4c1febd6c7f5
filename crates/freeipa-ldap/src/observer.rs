//! Injected observer for directory lifecycle events.
//!
//! The client never touches global logging state itself; every event goes through the
//! [`DirectoryObserver`] handed to [`crate::IpaServerBuilder`]. [`TracingObserver`] is the default
//! and forwards events to `tracing`.

use crate::{anon_bind::AnonBindPolicy, identity::ServerIdentity, partition::Partition};
use freeipa_core::Error;
use tracing::{debug, error, warn};

/// Receives lifecycle events from a server handle. All methods default to no-ops.
pub trait DirectoryObserver: Send + Sync {
    /// A session was opened and bound.
    fn connected(&self, _url: &str, _protocol: &str) {}

    /// Opening the session or binding failed; construction is aborted. `error` tells the two
    /// apart ([`Error::ConnectionFailed`], [`Error::Timeout`] or [`Error::BindFailed`]).
    fn connect_failed(&self, _url: &str, _error: &Error) {}

    /// A discovered field could not be resolved and stays absent.
    fn discovery_degraded(&self, _field: &'static str, _reason: &str) {}

    /// Server identity discovery finished.
    fn identity_resolved(&self, _identity: &ServerIdentity) {}

    /// A search failed and its result was replaced by an empty or absent value.
    fn search_failed(&self, _error: &Error) {}

    /// A returned entry was not cached.
    fn entry_skipped(&self, _dn: &str, _reason: &str) {}

    /// A user partition was loaded.
    fn users_loaded(&self, _partition: Partition, _count: usize) {}

    /// The group collection was loaded.
    fn groups_loaded(&self, _count: usize) {}

    /// The anonymous-bind policy was resolved.
    fn anon_bind_resolved(&self, _policy: AnonBindPolicy) {}
}

/// Observer that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DirectoryObserver for TracingObserver {
    fn connected(&self, url: &str, protocol: &str) {
        debug!(%url, "{protocol} connection established");
    }

    fn connect_failed(&self, url: &str, error: &Error) {
        error!(%url, code = error.error_code(), "{error}");
    }

    fn discovery_degraded(&self, field: &'static str, reason: &str) {
        warn!(field, "server discovery incomplete: {reason}");
    }

    fn identity_resolved(&self, identity: &ServerIdentity) {
        debug!(
            hostname = identity.hostname().unwrap_or_default(),
            domain = identity.domain().unwrap_or_default(),
            ip = ?identity.ip(),
            base_dn = identity.base_dn().map(|dn| dn.as_str()).unwrap_or_default(),
            "server identity resolved"
        );
    }

    fn search_failed(&self, error: &Error) {
        warn!(code = error.error_code(), "{error}");
    }

    fn entry_skipped(&self, dn: &str, reason: &str) {
        warn!(%dn, "skipping entry: {reason}");
    }

    fn users_loaded(&self, partition: Partition, count: usize) {
        debug!(%partition, count, "user partition loaded");
    }

    fn groups_loaded(&self, count: usize) {
        debug!(count, "groups loaded");
    }

    fn anon_bind_resolved(&self, policy: AnonBindPolicy) {
        debug!(%policy, "anonymous bind policy resolved");
    }
}
