use std::sync::Arc;

use medgate_core::AppResult;
use medgate_domain::{Permission, SystemPermission};

use crate::{
    AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository, AuthorizationService,
    SecurityAdminRepository, SessionContext,
};

mod roles;
mod users;

pub use roles::SaveRoleRequest;

const DEFAULT_AUDIT_LOG_LIMIT: usize = 50;
const MAX_AUDIT_LOG_LIMIT: usize = 200;

/// Application service for security administration workflows.
#[derive(Clone)]
pub struct SecurityAdminService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn SecurityAdminRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl SecurityAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn SecurityAdminRepository>,
        audit_log_repository: Arc<dyn AuditLogRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            audit_log_repository,
            audit_repository,
        }
    }

    /// Returns the provisioned permission catalogue.
    pub async fn list_permissions(&self, actor: &SessionContext) -> AppResult<Vec<Permission>> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageRoles)
            .await?;

        self.repository.list_permissions().await
    }

    /// Returns audit entries, newest first.
    ///
    /// A zero limit falls back to the default page size and larger limits
    /// are clamped.
    pub async fn list_audit_log(
        &self,
        actor: &SessionContext,
        mut query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ViewAuditLog)
            .await?;

        query.limit = match query.limit {
            0 => DEFAULT_AUDIT_LOG_LIMIT,
            limit => limit.min(MAX_AUDIT_LOG_LIMIT),
        };

        self.audit_log_repository.list_recent_entries(query).await
    }
}
