use async_trait::async_trait;

use medgate_core::{AppResult, UserId};
use medgate_domain::{Permission, PermissionId, PermissionName, Role, RoleId, RoleName, User};

/// Repository port for permanent permission lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists the union of permissions granted by the user's roles.
    async fn list_permissions_for_user(&self, user_id: UserId) -> AppResult<Vec<PermissionName>>;
}

/// Role payload accepted by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRoleInput {
    /// Unique role name.
    pub name: RoleName,
    /// Permissions granted by the role.
    pub permission_ids: Vec<PermissionId>,
}

/// Result of making sure a signed-in user has a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserProvisioning {
    /// The user already existed.
    Existing(User),
    /// The user was created with the default role.
    Created(User),
}

impl UserProvisioning {
    /// Returns the provisioned user.
    #[must_use]
    pub fn user(&self) -> &User {
        match self {
            Self::Existing(user) | Self::Created(user) => user,
        }
    }
}

/// Repository port for the permission catalogue, roles and users.
#[async_trait]
pub trait SecurityAdminRepository: Send + Sync {
    /// Lists provisioned permissions ordered by name.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Finds a permission by name.
    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>>;

    /// Finds a permission by id.
    async fn find_permission_by_id(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>>;

    /// Lists roles with their permissions ordered by name.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Finds one role.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Creates an unprotected role. Duplicate names yield `Conflict`.
    async fn create_role(&self, input: SaveRoleInput) -> AppResult<Role>;

    /// Replaces a role's name and permission set.
    async fn update_role(&self, role_id: RoleId, input: SaveRoleInput) -> AppResult<Role>;

    /// Deletes a role and its assignments.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Lists users with their roles ordered by display name.
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Finds one user with roles.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Creates the user with the default role when no row exists yet.
    async fn ensure_user(&self, user_id: UserId, display_name: &str)
    -> AppResult<UserProvisioning>;

    /// Replaces the user's role set.
    async fn set_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> AppResult<User>;
}
