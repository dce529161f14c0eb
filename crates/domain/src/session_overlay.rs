//! Per-session temporary permission grants layered above permanent roles.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PermissionName;

/// One temporary grant addressed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayGrant {
    /// Granted permission.
    pub permission_name: PermissionName,
    /// Grant expiry.
    pub expires_at: DateTime<Utc>,
}

/// Session-scoped map of permission name to expiry.
///
/// Serialised as a JSON object of name to RFC3339 timestamp. Entries are
/// only honoured while `now < expiry`; nothing sweeps them in the background.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionPermissionOverlay {
    entries: BTreeMap<PermissionName, DateTime<Utc>>,
}

impl SessionPermissionOverlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a grant. A later write for the same permission replaces the earlier one.
    pub fn grant(&mut self, permission_name: PermissionName, expires_at: DateTime<Utc>) {
        self.entries.insert(permission_name, expires_at);
    }

    /// Applies a delivered grant.
    pub fn apply(&mut self, grant: OverlayGrant) {
        self.grant(grant.permission_name, grant.expires_at);
    }

    /// Returns the expiry of a grant that is still live at `now`.
    #[must_use]
    pub fn live_expiry(&self, permission_name: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.entries
            .get(permission_name)
            .copied()
            .filter(|expires_at| *expires_at > now)
    }

    /// Returns whether a live grant exists for the permission.
    #[must_use]
    pub fn is_granted(&self, permission_name: &str, now: DateTime<Utc>) -> bool {
        self.live_expiry(permission_name, now).is_some()
    }

    /// Folds another overlay in, keeping the later expiry per permission.
    /// Returns whether any entry changed.
    pub fn merge(&mut self, other: &SessionPermissionOverlay) -> bool {
        let mut changed = false;
        for (permission_name, expires_at) in &other.entries {
            if self
                .entries
                .get(permission_name)
                .is_none_or(|existing| existing < expires_at)
            {
                self.entries.insert(permission_name.clone(), *expires_at);
                changed = true;
            }
        }
        changed
    }

    /// Drops entries whose expiry is at or before `now` and returns how many were dropped.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before - self.entries.len()
    }

    /// Returns live grants ordered by permission name.
    #[must_use]
    pub fn live_grants(&self, now: DateTime<Utc>) -> Vec<OverlayGrant> {
        self.entries
            .iter()
            .filter(|(_, expires_at)| **expires_at > now)
            .map(|(permission_name, expires_at)| OverlayGrant {
                permission_name: permission_name.clone(),
                expires_at: *expires_at,
            })
            .collect()
    }

    /// Returns whether the overlay holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
