use chrono::{DateTime, Utc};
use medgate_application::SessionContext;
use medgate_domain::PermissionName;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for bootstrap sign-in.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/bootstrap-request.ts"
)]
pub struct BootstrapRequest {
    pub user_id: Option<String>,
    pub display_name: String,
    pub token: String,
}

/// Live temporary grant held by the current session.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/temporary-grant-response.ts"
)]
pub struct TemporaryGrantResponse {
    pub permission: String,
    pub expires_at: String,
}

/// API representation of the signed-in user and what they may do.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/current-user-response.ts"
)]
pub struct CurrentUserResponse {
    pub user_id: String,
    pub display_name: String,
    pub permissions: Vec<String>,
    pub temporary_permissions: Vec<TemporaryGrantResponse>,
}

impl CurrentUserResponse {
    /// Builds the response from role-derived permissions and the session's live grants.
    #[must_use]
    pub fn new(
        session: &SessionContext,
        permissions: Vec<PermissionName>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: session.user_id().to_string(),
            display_name: session.identity().display_name().to_owned(),
            permissions: permissions
                .into_iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
            temporary_permissions: session
                .overlay()
                .live_grants(now)
                .into_iter()
                .map(|grant| TemporaryGrantResponse {
                    permission: grant.permission_name.as_str().to_owned(),
                    expires_at: grant.expires_at.to_rfc3339(),
                })
                .collect(),
        }
    }
}
