use std::sync::Arc;

use medgate_core::{AppError, AppResult, UserId, UserIdentity};
use medgate_domain::{AuditAction, User};

use crate::security_ports::record_audit_event;
use crate::{AuditEvent, AuditRepository, SecurityAdminRepository, UserProvisioning};

/// Application service for sign-in bookkeeping.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn SecurityAdminRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl UserService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SecurityAdminRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            audit_repository,
        }
    }

    /// Records a sign-in, creating the user with the default role the
    /// first time it is seen.
    pub async fn sign_in(&self, user_id: UserId, display_name: &str) -> AppResult<UserIdentity> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::Validation(
                "display_name must not be empty".to_owned(),
            ));
        }

        let provisioning = self.repository.ensure_user(user_id, display_name).await?;

        if let UserProvisioning::Created(user) = &provisioning {
            tracing::info!(%user_id, "registered user on first sign-in");
            record_audit_event(
                self.audit_repository.as_ref(),
                AuditEvent {
                    actor: Some(user_id),
                    action: AuditAction::UserRegister,
                    resource_type: "user".to_owned(),
                    resource_id: user_id.to_string(),
                    detail: Some(format!("registered '{}'", user.display_name)),
                },
            )
            .await?;
        }

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(user_id),
                action: AuditAction::UserLogin,
                resource_type: "user".to_owned(),
                resource_id: user_id.to_string(),
                detail: None,
            },
        )
        .await?;

        let user = provisioning.user();
        Ok(UserIdentity::new(user.user_id, user.display_name.clone()))
    }

    /// Records a sign-out.
    pub async fn sign_out(&self, identity: &UserIdentity) -> AppResult<()> {
        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(identity.user_id()),
                action: AuditAction::UserLogout,
                resource_type: "user".to_owned(),
                resource_id: identity.user_id().to_string(),
                detail: None,
            },
        )
        .await
    }

    /// Finds a user with roles.
    pub async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        self.repository.find_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use medgate_core::UserId;
    use medgate_domain::{AuditAction, DEFAULT_ROLE_NAME};

    use crate::test_support::{FakeAuditRepository, FakeDirectory};

    use super::UserService;

    #[tokio::test]
    async fn first_sign_in_registers_with_default_role() {
        let directory = Arc::new(FakeDirectory::seeded());
        let audit = Arc::new(FakeAuditRepository::default());
        let service = UserService::new(directory.clone(), audit.clone());
        let user_id = UserId::new();

        let identity = service.sign_in(user_id, " Dana ").await;
        assert!(identity.is_ok());

        let user = service.find_user(user_id).await.unwrap_or_default();
        let roles: Vec<String> = user
            .map(|user| user.roles.iter().map(|role| role.name.to_string()).collect())
            .unwrap_or_default();
        assert_eq!(roles, vec![DEFAULT_ROLE_NAME.to_owned()]);

        let _ = service.sign_in(user_id, "Dana").await;
        assert_eq!(
            audit.actions().await,
            vec![
                AuditAction::UserRegister,
                AuditAction::UserLogin,
                AuditAction::UserLogin
            ]
        );
    }

    #[tokio::test]
    async fn blank_display_name_is_rejected() {
        let service = UserService::new(
            Arc::new(FakeDirectory::seeded()),
            Arc::new(FakeAuditRepository::default()),
        );

        let result = service.sign_in(UserId::new(), "   ").await;
        assert!(matches!(
            result,
            Err(medgate_core::AppError::Validation(_))
        ));
    }
}
