use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use medgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::PermissionId;

const PERMISSION_NAME_MAX_LENGTH: usize = 50;

/// Validated permission name such as `view_sensitive_data`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName(String);

impl PermissionName {
    /// Creates a validated permission name.
    ///
    /// Names are 1 to 50 characters of lowercase ASCII letters, digits and `_`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "permission name must not be empty".to_owned(),
            ));
        }

        if trimmed.len() > PERMISSION_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "permission name must not exceed {PERMISSION_NAME_MAX_LENGTH} characters"
            )));
        }

        if !trimmed
            .chars()
            .all(|character| matches!(character, 'a'..='z' | '0'..='9' | '_'))
        {
            return Err(AppError::Validation(format!(
                "permission name '{trimmed}' may only contain lowercase letters, digits and '_'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the permission name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PermissionName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl Borrow<str> for PermissionName {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for PermissionName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionName> for String {
    fn from(value: PermissionName) -> Self {
        value.0
    }
}

impl FromStr for PermissionName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

/// Provisioned permission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub permission_id: PermissionId,
    /// Unique permission name.
    pub name: PermissionName,
}

/// Permissions the platform itself checks before administrative operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemPermission {
    /// Allows editing users and their role membership.
    ManageUsers,
    /// Allows creating, editing and deleting roles.
    ManageRoles,
    /// Allows managing the permission catalogue.
    ManagePermissions,
    /// Allows viewing sensitive clinical data.
    ViewSensitiveData,
    /// Allows editing patient records.
    EditPatient,
    /// Allows deleting patient records.
    DeletePatient,
    /// Allows entering consultation findings.
    EnterConsultation,
    /// Allows entering lab results.
    EnterLabResults,
    /// Allows issuing and revoking temporary access codes.
    ManageTempCodes,
    /// Allows reading the audit trail.
    ViewAuditLog,
    /// Allows bulk data uploads.
    UploadData,
    /// Allows changing platform settings.
    ManageSettings,
    /// Allows approving or denying access requests.
    ManageAccessRequests,
}

impl SystemPermission {
    /// Returns the provisioned permission name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageRoles => "manage_roles",
            Self::ManagePermissions => "manage_permissions",
            Self::ViewSensitiveData => "view_sensitive_data",
            Self::EditPatient => "edit_patient",
            Self::DeletePatient => "delete_patient",
            Self::EnterConsultation => "enter_consultation",
            Self::EnterLabResults => "enter_lab_results",
            Self::ManageTempCodes => "manage_temp_codes",
            Self::ViewAuditLog => "view_audit_log",
            Self::UploadData => "upload_data",
            Self::ManageSettings => "manage_settings",
            Self::ManageAccessRequests => "manage_access_requests",
        }
    }

    /// Returns all provisioned system permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[SystemPermission] = &[
            SystemPermission::ManageUsers,
            SystemPermission::ManageRoles,
            SystemPermission::ManagePermissions,
            SystemPermission::ViewSensitiveData,
            SystemPermission::EditPatient,
            SystemPermission::DeletePatient,
            SystemPermission::EnterConsultation,
            SystemPermission::EnterLabResults,
            SystemPermission::ManageTempCodes,
            SystemPermission::ViewAuditLog,
            SystemPermission::UploadData,
            SystemPermission::ManageSettings,
            SystemPermission::ManageAccessRequests,
        ];

        ALL
    }
}

impl Display for SystemPermission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for SystemPermission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown system permission '{value}'")))
    }
}

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A user account was created on first sign-in.
    UserRegister,
    /// A user signed in.
    UserLogin,
    /// A user signed out.
    UserLogout,
    /// A role was created.
    CreateRole,
    /// A role was renamed or its permissions changed.
    EditRole,
    /// A role was deleted.
    DeleteRole,
    /// A user's role membership was replaced.
    EditUser,
    /// A temporary access code was issued.
    GenerateTempCode,
    /// A temporary access code was activated into a session.
    ActivateTempCode,
    /// A temporary access code was revoked.
    RevokeTempCode,
    /// A user asked for a permission.
    RequestAccess,
    /// An access request was approved.
    ApproveAccessRequest,
    /// An access request was denied.
    DenyAccessRequest,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRegister => "USER_REGISTER",
            Self::UserLogin => "USER_LOGIN",
            Self::UserLogout => "USER_LOGOUT",
            Self::CreateRole => "CREATE_ROLE",
            Self::EditRole => "EDIT_ROLE",
            Self::DeleteRole => "DELETE_ROLE",
            Self::EditUser => "EDIT_USER",
            Self::GenerateTempCode => "GENERATE_TEMP_CODE",
            Self::ActivateTempCode => "ACTIVATE_TEMP_CODE",
            Self::RevokeTempCode => "REVOKE_TEMP_CODE",
            Self::RequestAccess => "REQUEST_ACCESS",
            Self::ApproveAccessRequest => "APPROVE_ACCESS_REQUEST",
            Self::DenyAccessRequest => "DENY_ACCESS_REQUEST",
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
