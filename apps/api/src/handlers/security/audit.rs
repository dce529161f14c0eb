use super::*;

#[derive(Debug, serde::Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub action: Option<String>,
    pub actor: Option<String>,
}

pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Json<Vec<AuditLogEntryResponse>>> {
    let actor = query
        .actor
        .as_deref()
        .map(UserId::from_str)
        .transpose()?;

    let entries = state
        .security_admin_service
        .list_audit_log(
            &session,
            medgate_application::AuditLogQuery {
                limit: query.limit.unwrap_or(50),
                offset: query.offset.unwrap_or(0),
                action: query.action,
                actor,
            },
        )
        .await?
        .into_iter()
        .map(AuditLogEntryResponse::from)
        .collect();

    Ok(Json(entries))
}
