use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use medgate_application::SessionContext;
use medgate_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::dto::CurrentUserResponse;
use crate::error::ApiResult;
use crate::state::AppState;

use super::SESSION_USER_KEY;

pub async fn logout_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<StatusCode> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?;

    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    if let Some(identity) = identity {
        state.user_service.sign_out(&identity).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let permissions = state
        .authorization_service
        .permanent_permissions(session.user_id())
        .await?;

    Ok(Json(CurrentUserResponse::new(
        &session,
        permissions,
        state.clock.now(),
    )))
}
