//! Per-target follow/connection status cache.
//!
//! The network surfaces ask for the viewer's relationship to a target many
//! times per render. Statuses are cached per target id with a short TTL;
//! a stale or missing entry reads as the default ("none") and the caller
//! decides whether to refetch. Lookups never touch the database.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::types::{ConnectionStatus, FollowStatus};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
struct CachedStatus {
    follow_status: FollowStatus,
    connection_status: ConnectionStatus,
    last_updated: Instant,
}

/// Thread-safe status cache, shared across services via `AppState`.
#[derive(Debug)]
pub struct StatusCache {
    entries: DashMap<String, CachedStatus>,
    ttl: Duration,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Explicit TTL, used by tests to force expiry.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn fresh(&self, entry: &CachedStatus) -> bool {
        entry.last_updated.elapsed() < self.ttl
    }

    /// Cached follow status toward `target_id`. Stale or missing entries
    /// read as `None` status.
    pub fn follow_status(&self, target_id: &str) -> FollowStatus {
        match self.entries.get(target_id) {
            Some(entry) if self.fresh(&entry) => entry.follow_status,
            _ => FollowStatus::None,
        }
    }

    /// Cached connection status toward `target_id`. Stale or missing entries
    /// read as `None` status.
    pub fn connection_status(&self, target_id: &str) -> ConnectionStatus {
        match self.entries.get(target_id) {
            Some(entry) if self.fresh(&entry) => entry.connection_status,
            _ => ConnectionStatus::None,
        }
    }

    /// True when an entry exists but has outlived the TTL. Lets callers
    /// distinguish "expired" from "never fetched" when deciding to refetch.
    pub fn is_stale(&self, target_id: &str) -> bool {
        match self.entries.get(target_id) {
            Some(entry) => !self.fresh(&entry),
            None => false,
        }
    }

    /// Write through the follow status, preserving any cached connection
    /// status for the same target. Resets the entry's clock.
    pub fn update_follow_status(&self, target_id: &str, status: FollowStatus) {
        let connection_status = self
            .entries
            .get(target_id)
            .filter(|entry| self.fresh(entry))
            .map(|entry| entry.connection_status)
            .unwrap_or(ConnectionStatus::None);
        self.entries.insert(
            target_id.to_string(),
            CachedStatus {
                follow_status: status,
                connection_status,
                last_updated: Instant::now(),
            },
        );
    }

    /// Write through the connection status, preserving any cached follow
    /// status for the same target. Resets the entry's clock.
    pub fn update_connection_status(&self, target_id: &str, status: ConnectionStatus) {
        let follow_status = self
            .entries
            .get(target_id)
            .filter(|entry| self.fresh(entry))
            .map(|entry| entry.follow_status)
            .unwrap_or(FollowStatus::None);
        self.entries.insert(
            target_id.to_string(),
            CachedStatus {
                follow_status,
                connection_status: status,
                last_updated: Instant::now(),
            },
        );
    }

    /// Replace both statuses for a target, e.g. after a fresh database read.
    pub fn refresh(&self, target_id: &str, follow: FollowStatus, connection: ConnectionStatus) {
        self.entries.insert(
            target_id.to_string(),
            CachedStatus {
                follow_status: follow,
                connection_status: connection,
                last_updated: Instant::now(),
            },
        );
    }

    /// Drop every entry. Used at sign-out so the next viewer starts cold.
    pub fn clear_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}
