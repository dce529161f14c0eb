use axum::Json;
use axum::extract::{Extension, State};
use medgate_application::{AccessDecision, SessionContext};
use medgate_domain::SystemPermission;

use crate::dto::SensitiveDataResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn sensitive_data_handler(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> ApiResult<Json<SensitiveDataResponse>> {
    let decision = state
        .authorization_service
        .authorize(Some(&context), SystemPermission::ViewSensitiveData.as_str())
        .await?;

    let (access, expires_at) = match decision {
        AccessDecision::Permanent => ("permanent", None),
        AccessDecision::Temporary { expires_at } => ("temporary", Some(expires_at.to_rfc3339())),
    };

    Ok(Json(SensitiveDataResponse {
        message: "This is sensitive data.".to_owned(),
        access,
        expires_at,
    }))
}
