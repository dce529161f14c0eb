use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use medgate_application::SessionContext;
use medgate_core::UserId;
use medgate_domain::{AccessCodeId, PermissionId, RoleId};

use crate::dto::{
    AuditLogEntryResponse, IssueTempCodeRequest, IssuedTempCodeResponse, PermissionResponse,
    RoleResponse, SaveRoleRequest, SetUserRolesRequest, TempCodeResponse, UserResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod audit;
mod roles;
mod temporary_access;
mod users;

pub use audit::list_audit_log_handler;
pub use roles::{
    create_role_handler, delete_role_handler, list_permissions_handler, list_roles_handler,
    update_role_handler,
};
pub use temporary_access::{
    issue_temp_code_handler, list_temp_codes_handler, revoke_temp_code_handler,
};
pub use users::{list_users_handler, set_user_roles_handler};
