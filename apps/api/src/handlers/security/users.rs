use super::*;

pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state
        .security_admin_service
        .list_users(&session)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn set_user_roles_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(user_id): Path<String>,
    Json(payload): Json<SetUserRolesRequest>,
) -> ApiResult<Json<UserResponse>> {
    let role_ids = payload
        .role_ids
        .iter()
        .map(|value| RoleId::from_str(value.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let user = state
        .security_admin_service
        .set_user_roles(&session, UserId::from_str(user_id.as_str())?, role_ids)
        .await?;

    Ok(Json(UserResponse::from(user)))
}
