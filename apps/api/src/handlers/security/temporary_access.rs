use super::*;

#[derive(Debug, serde::Deserialize)]
pub struct TempCodeListQuery {
    pub user_id: Option<String>,
    pub usable_only: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn issue_temp_code_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(payload): Json<IssueTempCodeRequest>,
) -> ApiResult<(StatusCode, Json<IssuedTempCodeResponse>)> {
    let issued = state
        .temporary_access_service
        .issue_temp_code(
            &session,
            medgate_application::IssueTempCodeInput {
                user_id: UserId::from_str(payload.user_id.as_str())?,
                permission_id: PermissionId::from_str(payload.permission_id.as_str())?,
                duration_minutes: payload.duration_minutes,
                is_single_use: payload.is_single_use,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedTempCodeResponse::from(issued)),
    ))
}

pub async fn list_temp_codes_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<TempCodeListQuery>,
) -> ApiResult<Json<Vec<TempCodeResponse>>> {
    let user_id = query
        .user_id
        .as_deref()
        .map(UserId::from_str)
        .transpose()?;
    let usable_at = query
        .usable_only
        .unwrap_or(false)
        .then(|| state.clock.now());

    let codes = state
        .temporary_access_service
        .list_codes(
            &session,
            medgate_application::AccessCodeQuery {
                user_id,
                usable_at,
                limit: query.limit.unwrap_or(50),
                offset: query.offset.unwrap_or(0),
            },
        )
        .await?
        .into_iter()
        .map(TempCodeResponse::from)
        .collect();

    Ok(Json(codes))
}

pub async fn revoke_temp_code_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(code_id): Path<String>,
) -> ApiResult<Json<TempCodeResponse>> {
    let code = state
        .temporary_access_service
        .revoke_code(&session, AccessCodeId::from_str(code_id.as_str())?)
        .await?;

    Ok(Json(TempCodeResponse::from(code)))
}
