use std::collections::BTreeSet;

use medgate_core::UserId;
use serde::{Deserialize, Serialize};

use crate::{PermissionName, Role};

/// Platform user with its permanent role membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Human-readable name.
    pub display_name: String,
    /// Assigned roles.
    pub roles: Vec<Role>,
}

impl User {
    /// Returns whether any assigned role grants the permission.
    #[must_use]
    pub fn has_permission(&self, permission_name: &str) -> bool {
        self.roles.iter().any(|role| role.grants(permission_name))
    }

    /// Returns the union of permissions over all assigned roles.
    #[must_use]
    pub fn effective_permissions(&self) -> BTreeSet<PermissionName> {
        self.roles
            .iter()
            .flat_map(|role| role.permissions.iter().cloned())
            .collect()
    }
}
