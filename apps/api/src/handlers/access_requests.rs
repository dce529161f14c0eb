use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use medgate_application::{AccessRequestSubmission, SessionContext};
use medgate_domain::{AccessRequestId, AccessRequestResolution};
use serde::Deserialize;

use crate::dto::{
    AccessRequestResponse, ResolveAccessRequestRequest, ResolvedAccessRequestResponse,
    SubmitAccessRequestRequest, SubmitAccessRequestResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccessRequestListQuery {
    /// `pending` lists the approver queue, anything else the caller's own requests.
    pub scope: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_access_requests_handler(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Query(query): Query<AccessRequestListQuery>,
) -> ApiResult<Json<Vec<AccessRequestResponse>>> {
    let requests = if query.scope.as_deref() == Some("pending") {
        state
            .access_request_service
            .list_pending_requests(
                &context,
                query.limit.unwrap_or(50),
                query.offset.unwrap_or(0),
            )
            .await?
    } else {
        state
            .access_request_service
            .list_my_requests(&context)
            .await?
    };

    Ok(Json(
        requests
            .into_iter()
            .map(AccessRequestResponse::from)
            .collect(),
    ))
}

pub async fn submit_access_request_handler(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Json(payload): Json<SubmitAccessRequestRequest>,
) -> ApiResult<(StatusCode, Json<SubmitAccessRequestResponse>)> {
    let submission = state
        .access_request_service
        .submit_access_request(&context, payload.permission.as_str())
        .await?;

    let status = match submission {
        AccessRequestSubmission::Created(_) => StatusCode::CREATED,
        AccessRequestSubmission::AlreadyPending(_) => StatusCode::OK,
    };

    Ok((status, Json(SubmitAccessRequestResponse::from(submission))))
}

pub async fn resolve_access_request_handler(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Path(request_id): Path<String>,
    Json(payload): Json<ResolveAccessRequestRequest>,
) -> ApiResult<Json<ResolvedAccessRequestResponse>> {
    let outcome = state
        .access_request_service
        .resolve_access_request(
            &context,
            AccessRequestId::from_str(request_id.as_str())?,
            AccessRequestResolution::from_str(payload.action.as_str())?,
        )
        .await?;

    Ok(Json(ResolvedAccessRequestResponse::from(outcome)))
}
