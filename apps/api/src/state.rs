use std::sync::Arc;

use medgate_application::{
    AccessRequestService, AuthorizationService, Clock, SecurityAdminService,
    SessionOverlayService, TemporaryAccessService, UserService,
};
use medgate_infrastructure::InMemoryNotificationHub;
use tower_sessions::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub security_admin_service: SecurityAdminService,
    pub authorization_service: AuthorizationService,
    pub temporary_access_service: TemporaryAccessService,
    pub access_request_service: AccessRequestService,
    pub user_service: UserService,
    pub session_overlay_service: SessionOverlayService,
    pub notification_hub: InMemoryNotificationHub,
    pub clock: Arc<dyn Clock>,
    pub session_store: Arc<dyn SessionStore>,
    pub postgres_pool: sqlx::PgPool,
    pub redis_client: Option<redis::Client>,
    pub frontend_url: String,
    pub bootstrap_token: String,
}
