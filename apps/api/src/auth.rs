use medgate_application::SessionContext;
use medgate_core::{AppError, AppResult, UserIdentity};
use medgate_domain::SessionPermissionOverlay;
use tower_sessions::Session;

mod bootstrap;
mod overlay;
mod session;

pub use bootstrap::bootstrap_handler;
pub use overlay::{persist_overlay, sync_session_overlay};
pub use session::{logout_handler, me_handler};

pub const SESSION_USER_KEY: &str = "user_identity";
/// Absolute session creation timestamp.
pub const SESSION_CREATED_AT_KEY: &str = "session_created_at";
/// Temporary grants held by this session, keyed by permission name.
pub const SESSION_OVERLAY_KEY: &str = "permission_overlay";

/// Reads the signed-in identity and its overlay, `None` when signed out.
pub async fn load_session_context(session: &Session) -> AppResult<Option<SessionContext>> {
    let Some(identity) = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
    else {
        return Ok(None);
    };

    let overlay = session
        .get::<SessionPermissionOverlay>(SESSION_OVERLAY_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session overlay: {error}")))?
        .unwrap_or_default();

    Ok(Some(SessionContext::new(identity, overlay)))
}

pub async fn store_overlay(session: &Session, overlay: &SessionPermissionOverlay) -> AppResult<()> {
    session
        .insert(SESSION_OVERLAY_KEY, overlay)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist session overlay: {error}")))
}
