use std::sync::Arc;

use medgate_application::{
    AccessRequestService, AccessRequestServiceDependencies, AuditRepository,
    AuthorizationService, Clock, OverlayGrantInbox, SecurityAdminRepository,
    SecurityAdminService, SessionOverlayService, SystemClock, TemporaryAccessService,
    UserService,
};
use medgate_core::AppError;
use medgate_infrastructure::{
    InMemoryNotificationHub, InMemoryOverlayGrantInbox, PostgresAccessCodeRepository,
    PostgresAccessRequestRepository, PostgresAuditLogRepository, PostgresAuditRepository,
    PostgresAuthorizationRepository, PostgresSecurityAdminRepository, RedisOverlayGrantInbox,
};
use sqlx::PgPool;
use tower_sessions::SessionStore;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::redis::build_redis_client;

pub fn build_app_state(
    pool: PgPool,
    session_store: Arc<dyn SessionStore>,
    config: &ApiConfig,
) -> Result<AppState, AppError> {
    let redis_client = config
        .redis_url
        .as_deref()
        .map(build_redis_client)
        .transpose()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let audit_repository: Arc<dyn AuditRepository> =
        Arc::new(PostgresAuditRepository::new(pool.clone()));
    let security_admin_repository: Arc<dyn SecurityAdminRepository> =
        Arc::new(PostgresSecurityAdminRepository::new(pool.clone()));

    let authorization_service = AuthorizationService::new(
        Arc::new(PostgresAuthorizationRepository::new(pool.clone())),
        clock.clone(),
    );

    let overlay_inbox: Arc<dyn OverlayGrantInbox> = match redis_client.clone() {
        Some(client) => {
            info!("using redis overlay grant inbox");
            // A queued grant is worthless once the grant it carries has expired.
            Arc::new(RedisOverlayGrantInbox::new(
                client,
                "medgate:overlay_grants",
                u64::from(config.access_request_grant_minutes) * 60,
            ))
        }
        None => Arc::new(InMemoryOverlayGrantInbox::new(clock.clone())),
    };
    let notification_hub = InMemoryNotificationHub::new();

    let temporary_access_service = TemporaryAccessService::new(
        authorization_service.clone(),
        security_admin_repository.clone(),
        Arc::new(PostgresAccessCodeRepository::new(pool.clone())),
        audit_repository.clone(),
        clock.clone(),
    )
    .with_max_duration_minutes(config.temp_code_max_duration_minutes);

    let access_request_service =
        AccessRequestService::new(AccessRequestServiceDependencies {
            authorization_service: authorization_service.clone(),
            temporary_access_service: temporary_access_service.clone(),
            admin_repository: security_admin_repository.clone(),
            request_repository: Arc::new(PostgresAccessRequestRepository::new(pool.clone())),
            overlay_inbox: overlay_inbox.clone(),
            notification_publisher: Arc::new(notification_hub.clone()),
            audit_repository: audit_repository.clone(),
            clock: clock.clone(),
        })
        .with_grant_duration_minutes(config.access_request_grant_minutes);

    Ok(AppState {
        security_admin_service: SecurityAdminService::new(
            authorization_service.clone(),
            security_admin_repository.clone(),
            Arc::new(PostgresAuditLogRepository::new(pool.clone())),
            audit_repository.clone(),
        ),
        user_service: UserService::new(security_admin_repository, audit_repository),
        session_overlay_service: SessionOverlayService::new(overlay_inbox, clock.clone()),
        authorization_service,
        temporary_access_service,
        access_request_service,
        notification_hub,
        clock,
        session_store,
        postgres_pool: pool,
        redis_client,
        frontend_url: config.frontend_url.clone(),
        bootstrap_token: config.bootstrap_token.clone(),
    })
}
