use medgate_core::{AppError, AppResult};
use medgate_domain::{AuditAction, PermissionId, Role, RoleId, RoleName, SystemPermission};

use crate::security_ports::record_audit_event;
use crate::{AuditEvent, SaveRoleInput, SessionContext};

use super::SecurityAdminService;

/// Role payload as submitted by administrators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRoleRequest {
    /// Role name.
    pub name: String,
    /// Permission names granted by the role.
    pub permissions: Vec<String>,
}

impl SecurityAdminService {
    /// Returns roles with their permissions.
    pub async fn list_roles(&self, actor: &SessionContext) -> AppResult<Vec<Role>> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageRoles)
            .await?;

        self.repository.list_roles().await
    }

    /// Creates a role and emits an audit event.
    pub async fn create_role(&self, actor: &SessionContext, request: SaveRoleRequest) -> AppResult<Role> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageRoles)
            .await?;

        let input = self.resolve_role_input(request).await?;
        let role = self.repository.create_role(input).await?;

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(actor.user_id()),
                action: AuditAction::CreateRole,
                resource_type: "role".to_owned(),
                resource_id: role.role_id.to_string(),
                detail: Some(format!(
                    "created role '{}' with permissions [{}]",
                    role.name,
                    join_permissions(&role)
                )),
            },
        )
        .await?;

        Ok(role)
    }

    /// Renames a role and replaces its permission set.
    pub async fn update_role(
        &self,
        actor: &SessionContext,
        role_id: RoleId,
        request: SaveRoleRequest,
    ) -> AppResult<Role> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageRoles)
            .await?;

        let existing = self.find_role(role_id).await?;
        let input = self.resolve_role_input(request).await?;
        existing.ensure_renamable_to(&input.name)?;

        let role = self.repository.update_role(role_id, input).await?;

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(actor.user_id()),
                action: AuditAction::EditRole,
                resource_type: "role".to_owned(),
                resource_id: role_id.to_string(),
                detail: Some(format!(
                    "updated role '{}' (was '{}') with permissions [{}]",
                    role.name,
                    existing.name,
                    join_permissions(&role)
                )),
            },
        )
        .await?;

        Ok(role)
    }

    /// Deletes an unprotected role.
    pub async fn delete_role(&self, actor: &SessionContext, role_id: RoleId) -> AppResult<()> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageRoles)
            .await?;

        let role = self.find_role(role_id).await?;
        role.ensure_deletable()?;
        self.repository.delete_role(role_id).await?;

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(actor.user_id()),
                action: AuditAction::DeleteRole,
                resource_type: "role".to_owned(),
                resource_id: role_id.to_string(),
                detail: Some(format!("deleted role '{}'", role.name)),
            },
        )
        .await
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    async fn resolve_role_input(&self, request: SaveRoleRequest) -> AppResult<SaveRoleInput> {
        let name = RoleName::new(request.name)?;
        let catalogue = self.repository.list_permissions().await?;

        let mut permission_ids: Vec<PermissionId> = Vec::with_capacity(request.permissions.len());
        for permission_name in &request.permissions {
            let permission = catalogue
                .iter()
                .find(|permission| permission.name.as_str() == permission_name.trim())
                .ok_or_else(|| {
                    AppError::NotFound(format!("permission '{permission_name}' does not exist"))
                })?;

            if !permission_ids.contains(&permission.permission_id) {
                permission_ids.push(permission.permission_id);
            }
        }

        Ok(SaveRoleInput {
            name,
            permission_ids,
        })
    }
}

fn join_permissions(role: &Role) -> String {
    role.permissions
        .iter()
        .map(|permission| permission.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
