use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use medgate_core::{AppError, UserId};
use medgate_domain::SessionPermissionOverlay;
use tower_sessions::Session;

use crate::dto::BootstrapRequest;
use crate::error::ApiResult;
use crate::state::AppState;

use super::{SESSION_CREATED_AT_KEY, SESSION_USER_KEY, store_overlay};

/// Signs in with the shared bootstrap token. Omitting `user_id` provisions a new user.
pub async fn bootstrap_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<BootstrapRequest>,
) -> ApiResult<StatusCode> {
    if payload.token != state.bootstrap_token {
        return Err(AppError::Unauthorized("invalid bootstrap token".to_owned()).into());
    }

    let user_id = payload
        .user_id
        .as_deref()
        .map(UserId::from_str)
        .transpose()?
        .unwrap_or_default();

    let identity = state
        .user_service
        .sign_in(user_id, payload.display_name.as_str())
        .await?;

    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to cycle session id: {error}")))?;

    session
        .insert(SESSION_USER_KEY, &identity)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session identity: {error}"))
        })?;

    store_overlay(&session, &SessionPermissionOverlay::new()).await?;

    session
        .insert(SESSION_CREATED_AT_KEY, state.clock.now().timestamp())
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session creation time: {error}"))
        })?;

    Ok(StatusCode::NO_CONTENT)
}
