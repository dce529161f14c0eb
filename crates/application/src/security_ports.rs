mod access_codes;
mod access_requests;
mod audit;
mod notifications;
mod repositories;

pub use access_codes::{AccessCodeQuery, AccessCodeRepository};
pub use access_requests::{AccessRequestQuery, AccessRequestRepository, AccessRequestSubmission};
pub(crate) use audit::record_audit_event;
pub use audit::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository};
pub use notifications::{
    APPROVERS_GROUP, NotificationChannel, NotificationEvent, NotificationPublisher,
    OverlayGrantInbox,
};
pub use repositories::{
    AuthorizationRepository, SaveRoleInput, SecurityAdminRepository, UserProvisioning,
};
