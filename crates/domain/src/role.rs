use std::fmt::{Display, Formatter};

use medgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{PermissionName, RoleId};

/// Name of the provisioned administrator role.
pub const ADMIN_ROLE_NAME: &str = "Admin";

/// Name of the provisioned role assigned on first sign-in.
pub const DEFAULT_ROLE_NAME: &str = "New User";

const ROLE_NAME_MAX_LENGTH: usize = 50;

/// Validated, trimmed role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Creates a validated role name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty".to_owned(),
            ));
        }

        if trimmed.chars().count() > ROLE_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "role name must not exceed {ROLE_NAME_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl TryFrom<String> for RoleName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

/// Named collection of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub role_id: RoleId,
    /// Unique role name.
    pub name: RoleName,
    /// Protected roles can be neither deleted nor renamed.
    pub is_protected: bool,
    /// Permissions granted by the role.
    pub permissions: Vec<PermissionName>,
}

impl Role {
    /// Returns whether the role grants the permission.
    #[must_use]
    pub fn grants(&self, permission_name: &str) -> bool {
        self.permissions
            .iter()
            .any(|permission| permission.as_str() == permission_name)
    }

    /// Rejects deletion of protected roles.
    pub fn ensure_deletable(&self) -> AppResult<()> {
        if self.is_protected {
            return Err(AppError::Conflict(format!(
                "role '{}' is protected and cannot be deleted",
                self.name
            )));
        }

        Ok(())
    }

    /// Rejects renaming protected roles. Keeping the same name is always allowed.
    pub fn ensure_renamable_to(&self, name: &RoleName) -> AppResult<()> {
        if self.is_protected && &self.name != name {
            return Err(AppError::Conflict(format!(
                "role '{}' is protected and cannot be renamed",
                self.name
            )));
        }

        Ok(())
    }
}
