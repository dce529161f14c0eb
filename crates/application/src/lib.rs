//! Application services and ports.

#![forbid(unsafe_code)]

mod access_request_service;
mod authorization_service;
mod clock;
mod security_admin_service;
mod security_ports;
mod session_context;
mod session_overlay_service;
mod temporary_access_service;
mod user_service;

#[cfg(test)]
mod test_support;

pub use access_request_service::{
    AccessRequestOutcome, AccessRequestService, AccessRequestServiceDependencies,
    DEFAULT_ACCESS_REQUEST_GRANT_MINUTES,
};
pub use authorization_service::{AccessDecision, AuthorizationService};
pub use clock::{Clock, SystemClock};
pub use security_admin_service::{SaveRoleRequest, SecurityAdminService};
pub use security_ports::{
    APPROVERS_GROUP, AccessCodeQuery, AccessCodeRepository, AccessRequestQuery,
    AccessRequestRepository, AccessRequestSubmission, AuditEvent, AuditLogEntry, AuditLogQuery,
    AuditLogRepository, AuditRepository, AuthorizationRepository, NotificationChannel,
    NotificationEvent, NotificationPublisher, OverlayGrantInbox, SaveRoleInput,
    SecurityAdminRepository, UserProvisioning,
};
pub use session_context::SessionContext;
pub use session_overlay_service::{OverlayRefresh, SessionOverlayService};
pub use temporary_access_service::{
    DEFAULT_MAX_TEMP_CODE_MINUTES, IssueTempCodeInput, IssuedAccessCode, TemporaryAccessService,
};
pub use user_service::UserService;
