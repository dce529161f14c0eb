use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use medgate_application::{SaveRoleInput, SecurityAdminRepository, UserProvisioning};
use medgate_core::{AppError, AppResult, UserId};
use medgate_domain::{
    Permission, PermissionId, PermissionName, Role, RoleId, RoleName, User,
};

mod permissions;
mod roles;
mod users;

/// PostgreSQL-backed repository for the permission catalogue, roles and users.
#[derive(Clone)]
pub struct PostgresSecurityAdminRepository {
    pool: PgPool,
}

impl PostgresSecurityAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    permission_id: uuid::Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: uuid::Uuid,
    role_name: String,
    is_protected: bool,
    permission_name: Option<String>,
}

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: uuid::Uuid,
    display_name: String,
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    user_id: uuid::Uuid,
    role_id: uuid::Uuid,
}

#[async_trait]
impl SecurityAdminRepository for PostgresSecurityAdminRepository {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.list_permissions_impl().await
    }

    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        self.find_permission_by_name_impl(name).await
    }

    async fn find_permission_by_id(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        self.find_permission_by_id_impl(permission_id).await
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.list_roles_impl(None).await
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.list_roles_impl(Some(role_id)).await?.into_iter().next())
    }

    async fn create_role(&self, input: SaveRoleInput) -> AppResult<Role> {
        self.create_role_impl(input).await
    }

    async fn update_role(&self, role_id: RoleId, input: SaveRoleInput) -> AppResult<Role> {
        self.update_role_impl(role_id, input).await
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.delete_role_impl(role_id).await
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.list_users_impl(None).await
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.list_users_impl(Some(user_id)).await?.into_iter().next())
    }

    async fn ensure_user(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> AppResult<UserProvisioning> {
        self.ensure_user_impl(user_id, display_name).await
    }

    async fn set_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> AppResult<User> {
        self.set_user_roles_impl(user_id, role_ids).await
    }
}

fn decode_permission_name(value: &str) -> AppResult<PermissionName> {
    PermissionName::new(value).map_err(|error| {
        AppError::Internal(format!("invalid stored permission '{value}': {error}"))
    })
}

fn permission_from_row(row: PermissionRow) -> AppResult<Permission> {
    Ok(Permission {
        permission_id: PermissionId::from_uuid(row.permission_id),
        name: decode_permission_name(row.name.as_str())?,
    })
}

/// Folds role rows ordered by role name into roles, preserving that order.
fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut roles: Vec<Role> = Vec::new();

    for row in rows {
        let role_id = RoleId::from_uuid(row.role_id);
        if roles.last().is_none_or(|role| role.role_id != role_id) {
            let name = RoleName::new(row.role_name.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored role name '{}': {error}",
                    row.role_name
                ))
            })?;
            roles.push(Role {
                role_id,
                name,
                is_protected: row.is_protected,
                permissions: Vec::new(),
            });
        }

        if let (Some(role), Some(permission_name)) = (roles.last_mut(), row.permission_name) {
            role.permissions
                .push(decode_permission_name(permission_name.as_str())?);
        }
    }

    Ok(roles)
}
