use std::str::FromStr;

use chrono::{DateTime, Utc};
use medgate_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

use crate::{AccessRequestId, Permission, PermissionId, PermissionName};

/// Lifecycle state of an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRequestStatus {
    /// Awaiting an approver.
    Pending,
    /// Granted; terminal.
    Approved,
    /// Refused; terminal.
    Denied,
}

impl AccessRequestStatus {
    /// Returns the storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }

    /// Returns whether no further transition is allowed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for AccessRequestStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            _ => Err(AppError::Validation(format!(
                "unknown access request status '{value}'"
            ))),
        }
    }
}

/// Approver decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRequestResolution {
    /// Grant the requested permission temporarily.
    Approve,
    /// Refuse the request.
    Deny,
}

impl AccessRequestResolution {
    /// Returns the transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
        }
    }

    /// Returns the terminal status this decision produces.
    #[must_use]
    pub fn resulting_status(&self) -> AccessRequestStatus {
        match self {
            Self::Approve => AccessRequestStatus::Approved,
            Self::Deny => AccessRequestStatus::Denied,
        }
    }
}

impl FromStr for AccessRequestResolution {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "approve" => Ok(Self::Approve),
            "deny" => Ok(Self::Deny),
            _ => Err(AppError::Validation(format!(
                "access request action must be 'approve' or 'deny', got '{value}'"
            ))),
        }
    }
}

/// A user's ask for a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Stable request identifier.
    pub request_id: AccessRequestId,
    /// Requesting user.
    pub user_id: UserId,
    /// Requested permission.
    pub permission_id: PermissionId,
    /// Requested permission name.
    pub permission_name: PermissionName,
    /// Current state.
    pub status: AccessRequestStatus,
    /// Submission timestamp.
    pub requested_at: DateTime<Utc>,
    /// Approver, set only on approval.
    pub approved_by: Option<UserId>,
    /// Approval timestamp, set only on approval.
    pub approved_at: Option<DateTime<Utc>>,
}

impl AccessRequest {
    /// Creates a pending request.
    #[must_use]
    pub fn pending(user_id: UserId, permission: &Permission, requested_at: DateTime<Utc>) -> Self {
        Self {
            request_id: AccessRequestId::new(),
            user_id,
            permission_id: permission.permission_id,
            permission_name: permission.name.clone(),
            status: AccessRequestStatus::Pending,
            requested_at,
            approved_by: None,
            approved_at: None,
        }
    }

    /// Moves a pending request to its terminal state.
    pub fn resolve(
        &mut self,
        resolution: AccessRequestResolution,
        approver: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::AlreadyResolved(format!(
                "access request '{}' is already {}",
                self.request_id,
                self.status.as_str()
            )));
        }

        self.status = resolution.resulting_status();
        if resolution == AccessRequestResolution::Approve {
            self.approved_by = Some(approver);
            self.approved_at = Some(now);
        }

        Ok(())
    }

    /// Returns an approved request to pending when its grant could not be issued.
    pub fn reopen(&mut self) -> AppResult<()> {
        if self.status != AccessRequestStatus::Approved {
            return Err(AppError::Conflict(format!(
                "access request '{}' is {} and cannot be reopened",
                self.request_id,
                self.status.as_str()
            )));
        }

        self.status = AccessRequestStatus::Pending;
        self.approved_by = None;
        self.approved_at = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use medgate_core::{AppError, UserId};

    use super::{AccessRequest, AccessRequestResolution, AccessRequestStatus};
    use crate::{Permission, PermissionId, PermissionName};

    fn permission() -> Permission {
        Permission {
            permission_id: PermissionId::new(),
            name: PermissionName::new("view_sensitive_data")
                .unwrap_or_else(|_| panic!("valid permission")),
        }
    }

    #[test]
    fn approval_records_approver_and_time() {
        let now = Utc::now();
        let approver = UserId::new();
        let mut request = AccessRequest::pending(UserId::new(), &permission(), now);

        let result = request.resolve(AccessRequestResolution::Approve, approver, now);

        assert!(result.is_ok());
        assert_eq!(request.status, AccessRequestStatus::Approved);
        assert_eq!(request.approved_by, Some(approver));
        assert_eq!(request.approved_at, Some(now));
    }

    #[test]
    fn denial_leaves_approval_fields_empty() {
        let now = Utc::now();
        let mut request = AccessRequest::pending(UserId::new(), &permission(), now);

        assert!(
            request
                .resolve(AccessRequestResolution::Deny, UserId::new(), now)
                .is_ok()
        );
        assert_eq!(request.status, AccessRequestStatus::Denied);
        assert_eq!(request.approved_by, None);
        assert_eq!(request.approved_at, None);
    }

    #[test]
    fn terminal_request_cannot_be_resolved_again() {
        let now = Utc::now();
        let approver = UserId::new();
        let mut request = AccessRequest::pending(UserId::new(), &permission(), now);
        assert!(
            request
                .resolve(AccessRequestResolution::Approve, approver, now)
                .is_ok()
        );
        let snapshot = request.clone();

        let again = request.resolve(
            AccessRequestResolution::Deny,
            UserId::new(),
            now + Duration::minutes(5),
        );

        assert!(matches!(again, Err(AppError::AlreadyResolved(_))));
        assert_eq!(request, snapshot);
    }

    #[test]
    fn only_approved_requests_reopen() {
        let now = Utc::now();
        let mut request = AccessRequest::pending(UserId::new(), &permission(), now);
        assert!(matches!(request.reopen(), Err(AppError::Conflict(_))));

        assert!(
            request
                .resolve(AccessRequestResolution::Approve, UserId::new(), now)
                .is_ok()
        );
        assert!(request.reopen().is_ok());
        assert_eq!(request.status, AccessRequestStatus::Pending);
        assert_eq!(request.approved_by, None);
        assert_eq!(request.approved_at, None);
    }

    #[test]
    fn resolution_parses_transport_values() {
        assert_eq!(
            "approve".parse::<AccessRequestResolution>().ok(),
            Some(AccessRequestResolution::Approve)
        );
        assert!("grant".parse::<AccessRequestResolution>().is_err());
    }
}
