use chrono::{DateTime, Utc};
use medgate_application::{SessionContext, SessionOverlayService};
use medgate_core::{AppError, AppResult};
use medgate_domain::SessionPermissionOverlay;
use tower_sessions::{Session, SessionStore};
use tracing::warn;

use super::{SESSION_OVERLAY_KEY, store_overlay};

/// Folds queued grants into the session and acknowledges them once stored.
pub async fn sync_session_overlay(
    overlay_service: &SessionOverlayService,
    store: &dyn SessionStore,
    session: &Session,
    context: &mut SessionContext,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let refresh = overlay_service.refresh(context).await?;

    if refresh.changed {
        let stored = persist_overlay(store, session, context.overlay(), now).await?;
        *context.overlay_mut() = stored;
    }

    // Unacknowledged grants are delivered again and merge without effect.
    if let Err(error) = overlay_service
        .acknowledge(context.user_id(), &refresh.delivered)
        .await
    {
        warn!(
            user_id = %context.user_id(),
            error = %error,
            "failed to acknowledge delivered overlay grants"
        );
    }

    Ok(())
}

/// Writes the overlay merged with whatever the store holds for this session.
///
/// Requests sharing a session each start from the overlay they loaded, so
/// entries another request stored in the meantime are read back first. The
/// later expiry wins per permission. The session is saved before returning.
pub async fn persist_overlay(
    store: &dyn SessionStore,
    session: &Session,
    overlay: &SessionPermissionOverlay,
    now: DateTime<Utc>,
) -> AppResult<SessionPermissionOverlay> {
    let mut merged = stored_overlay(store, session).await?;
    merged.merge(overlay);
    merged.prune_expired(now);

    store_overlay(session, &merged).await?;
    session
        .save()
        .await
        .map_err(|error| AppError::Internal(format!("failed to save session: {error}")))?;

    Ok(merged)
}

async fn stored_overlay(
    store: &dyn SessionStore,
    session: &Session,
) -> AppResult<SessionPermissionOverlay> {
    let Some(session_id) = session.id() else {
        return Ok(SessionPermissionOverlay::new());
    };

    let record = store
        .load(&session_id)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load session record: {error}")))?;

    record
        .and_then(|record| record.data.get(SESSION_OVERLAY_KEY).cloned())
        .map(serde_json::from_value::<SessionPermissionOverlay>)
        .transpose()
        .map(Option::unwrap_or_default)
        .map_err(|error| AppError::Internal(format!("invalid stored session overlay: {error}")))
}
