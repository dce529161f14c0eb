//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access_request;
mod ids;
mod role;
mod security;
mod session_overlay;
mod temporary_access;
mod user;

pub use access_request::{AccessRequest, AccessRequestResolution, AccessRequestStatus};
pub use ids::{AccessCodeId, AccessRequestId, PermissionId, RoleId};
pub use role::{ADMIN_ROLE_NAME, DEFAULT_ROLE_NAME, Role, RoleName};
pub use security::{AuditAction, Permission, PermissionName, SystemPermission};
pub use session_overlay::{OverlayGrant, SessionPermissionOverlay};
pub use temporary_access::{
    ACCESS_CODE_PREFIX, AccessCodeFormat, AccessCodeTerms, TemporaryAccessCode,
};
pub use user::User;
