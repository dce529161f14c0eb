use std::sync::Arc;

use chrono::{DateTime, Utc};

use medgate_core::{AppError, AppResult, UserId};
use medgate_domain::{PermissionName, SystemPermission};

use crate::{AuthorizationRepository, Clock, SessionContext};

/// Why a permission check succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Granted by one of the user's roles.
    Permanent,
    /// Granted by a live session overlay entry.
    Temporary {
        /// Grant expiry.
        expires_at: DateTime<Utc>,
    },
}

/// Application service for permission checks.
///
/// Checks are pure reads: the session overlay is consulted first and roles
/// only when no live temporary grant exists.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
    clock: Arc<dyn Clock>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Decides whether the caller holds the permission.
    ///
    /// `None` means the caller is not signed in and yields `Unauthorized`.
    pub async fn authorize(
        &self,
        session: Option<&SessionContext>,
        permission_name: &str,
    ) -> AppResult<AccessDecision> {
        let Some(session) = session else {
            return Err(AppError::Unauthorized(
                "authentication is required".to_owned(),
            ));
        };

        match self.resolve(session, permission_name).await? {
            Some(decision) => Ok(decision),
            None => Err(AppError::Forbidden(format!(
                "user '{}' is missing permission '{permission_name}'",
                session.user_id()
            ))),
        }
    }

    /// Ensures a signed-in caller holds a platform permission.
    pub async fn require_permission(
        &self,
        session: &SessionContext,
        permission: SystemPermission,
    ) -> AppResult<AccessDecision> {
        self.authorize(Some(session), permission.as_str()).await
    }

    /// Returns whether the caller currently holds the permission.
    pub async fn has_permission(
        &self,
        session: &SessionContext,
        permission_name: &str,
    ) -> AppResult<bool> {
        Ok(self.resolve(session, permission_name).await?.is_some())
    }

    /// Lists permissions granted by the user's roles.
    pub async fn permanent_permissions(&self, user_id: UserId) -> AppResult<Vec<PermissionName>> {
        let mut permissions = self.repository.list_permissions_for_user(user_id).await?;
        permissions.sort();
        permissions.dedup();
        Ok(permissions)
    }

    async fn resolve(
        &self,
        session: &SessionContext,
        permission_name: &str,
    ) -> AppResult<Option<AccessDecision>> {
        if let Some(expires_at) = session
            .overlay()
            .live_expiry(permission_name, self.clock.now())
        {
            return Ok(Some(AccessDecision::Temporary { expires_at }));
        }

        let permissions = self
            .repository
            .list_permissions_for_user(session.user_id())
            .await?;

        Ok(permissions
            .iter()
            .any(|permission| permission.as_str() == permission_name)
            .then_some(AccessDecision::Permanent))
    }
}
