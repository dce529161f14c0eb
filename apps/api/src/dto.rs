mod access;
mod auth;
mod common;
mod security;

pub use access::{
    AccessRequestResponse, ActivateCodeRequest, ActivatedGrantResponse, IssueTempCodeRequest,
    IssuedTempCodeResponse, ResolveAccessRequestRequest, ResolvedAccessRequestResponse,
    SubmitAccessRequestRequest, SubmitAccessRequestResponse, TempCodeResponse,
};
pub use auth::{BootstrapRequest, CurrentUserResponse, TemporaryGrantResponse};
pub use common::{HealthDependencyStatus, HealthResponse, SensitiveDataResponse};
pub use security::{
    AuditLogEntryResponse, PermissionResponse, RoleResponse, SaveRoleRequest,
    SetUserRolesRequest, UserResponse,
};

#[cfg(test)]
mod tests {
    use super::{
        AccessRequestResponse, ActivateCodeRequest, ActivatedGrantResponse,
        AuditLogEntryResponse, BootstrapRequest, CurrentUserResponse, HealthDependencyStatus,
        HealthResponse, IssueTempCodeRequest, IssuedTempCodeResponse, PermissionResponse,
        ResolveAccessRequestRequest, ResolvedAccessRequestResponse, RoleResponse,
        SaveRoleRequest, SensitiveDataResponse, SetUserRolesRequest, SubmitAccessRequestRequest,
        SubmitAccessRequestResponse, TempCodeResponse, TemporaryGrantResponse, UserResponse,
    };

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        BootstrapRequest::export(&config)?;
        CurrentUserResponse::export(&config)?;
        TemporaryGrantResponse::export(&config)?;
        HealthResponse::export(&config)?;
        HealthDependencyStatus::export(&config)?;
        SensitiveDataResponse::export(&config)?;
        PermissionResponse::export(&config)?;
        RoleResponse::export(&config)?;
        SaveRoleRequest::export(&config)?;
        UserResponse::export(&config)?;
        SetUserRolesRequest::export(&config)?;
        AuditLogEntryResponse::export(&config)?;
        IssueTempCodeRequest::export(&config)?;
        IssuedTempCodeResponse::export(&config)?;
        TempCodeResponse::export(&config)?;
        ActivateCodeRequest::export(&config)?;
        ActivatedGrantResponse::export(&config)?;
        SubmitAccessRequestRequest::export(&config)?;
        SubmitAccessRequestResponse::export(&config)?;
        AccessRequestResponse::export(&config)?;
        ResolveAccessRequestRequest::export(&config)?;
        ResolvedAccessRequestResponse::export(&config)?;
        ErrorResponse::export(&config)?;

        Ok(())
    }
}
