use axum::Json;
use axum::extract::{Extension, State};
use medgate_application::SessionContext;
use tower_sessions::Session;

use crate::auth::persist_overlay;
use crate::dto::{ActivateCodeRequest, ActivatedGrantResponse, TempCodeResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Redeems a code into the caller's session overlay.
pub async fn activate_code_handler(
    State(state): State<AppState>,
    session: Session,
    Extension(context): Extension<SessionContext>,
    Json(payload): Json<ActivateCodeRequest>,
) -> ApiResult<Json<ActivatedGrantResponse>> {
    let mut updated = context.clone();
    let result = state
        .temporary_access_service
        .activate_code(&mut updated, payload.code.as_str())
        .await;

    // The code is consumed once the overlay changed, even if the audit append failed.
    if updated.overlay() != context.overlay() {
        persist_overlay(
            state.session_store.as_ref(),
            &session,
            updated.overlay(),
            state.clock.now(),
        )
        .await?;
    }

    let grant = result?;
    Ok(Json(ActivatedGrantResponse::from(grant)))
}

pub async fn list_my_codes_handler(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> ApiResult<Json<Vec<TempCodeResponse>>> {
    let codes = state
        .temporary_access_service
        .list_active_codes_for_user(&context)
        .await?
        .into_iter()
        .map(TempCodeResponse::from)
        .collect();

    Ok(Json(codes))
}
