use medgate_core::{AppError, AppResult, UserId};
use medgate_domain::{AuditAction, RoleId, SystemPermission, User};

use crate::security_ports::record_audit_event;
use crate::{AuditEvent, SessionContext};

use super::SecurityAdminService;

impl SecurityAdminService {
    /// Returns users with their roles.
    pub async fn list_users(&self, actor: &SessionContext) -> AppResult<Vec<User>> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageUsers)
            .await?;

        self.repository.list_users().await
    }

    /// Replaces a user's role set and emits an audit event.
    pub async fn set_user_roles(
        &self,
        actor: &SessionContext,
        user_id: UserId,
        role_ids: Vec<RoleId>,
    ) -> AppResult<User> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageUsers)
            .await?;

        if self.repository.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user '{user_id}' does not exist")));
        }

        let mut role_ids = role_ids;
        role_ids.sort();
        role_ids.dedup();
        for role_id in &role_ids {
            if self.repository.find_role(*role_id).await?.is_none() {
                return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
            }
        }

        let user = self.repository.set_user_roles(user_id, &role_ids).await?;

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(actor.user_id()),
                action: AuditAction::EditUser,
                resource_type: "user".to_owned(),
                resource_id: user_id.to_string(),
                detail: Some(format!(
                    "set roles of '{}' to [{}]",
                    user.display_name,
                    user.roles
                        .iter()
                        .map(|role| role.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            },
        )
        .await?;

        Ok(user)
    }
}
