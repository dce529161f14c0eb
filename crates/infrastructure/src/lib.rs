//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_notification_hub;
mod in_memory_overlay_grant_inbox;
mod postgres_access_code_repository;
mod postgres_access_request_repository;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_authorization_repository;
mod postgres_security_admin_repository;
mod redis_overlay_grant_inbox;

#[cfg(test)]
mod test_database;

pub use in_memory_notification_hub::{InMemoryNotificationHub, NotificationStream};
pub use in_memory_overlay_grant_inbox::InMemoryOverlayGrantInbox;
pub use postgres_access_code_repository::PostgresAccessCodeRepository;
pub use postgres_access_request_repository::PostgresAccessRequestRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_security_admin_repository::PostgresSecurityAdminRepository;
pub use redis_overlay_grant_inbox::RedisOverlayGrantInbox;

/// Maps a unique-constraint violation to `Conflict` and anything else to `Internal`.
pub(crate) fn map_unique_violation(
    error: sqlx::Error,
    conflict_message: impl FnOnce() -> String,
    context: &str,
) -> medgate_core::AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return medgate_core::AppError::Conflict(conflict_message());
    }

    medgate_core::AppError::Internal(format!("failed to {context}: {error}"))
}
