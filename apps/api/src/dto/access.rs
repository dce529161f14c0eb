use medgate_application::{AccessRequestOutcome, AccessRequestSubmission, IssuedAccessCode};
use medgate_domain::{AccessRequest, OverlayGrant, TemporaryAccessCode};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for administrator code issuance.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/issue-temp-code-request.ts"
)]
pub struct IssueTempCodeRequest {
    pub user_id: String,
    pub permission_id: String,
    pub duration_minutes: u32,
    pub is_single_use: bool,
}

/// API representation of a stored code. Never carries the plaintext.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/temp-code-response.ts"
)]
pub struct TempCodeResponse {
    pub code_id: String,
    pub code_hint: String,
    pub user_id: String,
    pub permission: String,
    pub expires_at: String,
    pub is_single_use: bool,
    pub times_used: u32,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: String,
}

/// Freshly issued code, the only response that shows the plaintext.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/issued-temp-code-response.ts"
)]
pub struct IssuedTempCodeResponse {
    pub code: String,
    pub access_code: TempCodeResponse,
}

/// Incoming payload for code activation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/activate-code-request.ts"
)]
pub struct ActivateCodeRequest {
    pub code: String,
}

/// Grant written to the session by an activation.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/activated-grant-response.ts"
)]
pub struct ActivatedGrantResponse {
    pub permission: String,
    pub expires_at: String,
}

/// Incoming payload for an access request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/submit-access-request-request.ts"
)]
pub struct SubmitAccessRequestRequest {
    pub permission: String,
}

/// API representation of an access request.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/access-request-response.ts"
)]
pub struct AccessRequestResponse {
    pub request_id: String,
    pub user_id: String,
    pub permission: String,
    pub status: String,
    pub requested_at: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
}

/// Submission result. `already_pending` marks a deduplicated request.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/submit-access-request-response.ts"
)]
pub struct SubmitAccessRequestResponse {
    pub request: AccessRequestResponse,
    pub already_pending: bool,
}

/// Incoming payload for approving or denying a request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/resolve-access-request-request.ts"
)]
pub struct ResolveAccessRequestRequest {
    /// `approve` or `deny`.
    pub action: String,
}

/// Resolution result. Approvals carry the issued code's metadata, not its plaintext.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/resolved-access-request-response.ts"
)]
pub struct ResolvedAccessRequestResponse {
    pub request: AccessRequestResponse,
    pub issued_code: Option<TempCodeResponse>,
}

impl From<TemporaryAccessCode> for TempCodeResponse {
    fn from(value: TemporaryAccessCode) -> Self {
        Self {
            code_id: value.code_id.to_string(),
            code_hint: value.code_hint,
            user_id: value.user_id.to_string(),
            permission: value.permission_name.as_str().to_owned(),
            expires_at: value.expires_at.to_rfc3339(),
            is_single_use: value.is_single_use,
            times_used: value.times_used,
            is_active: value.is_active,
            created_by: value.created_by.map(|user_id| user_id.to_string()),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

impl From<IssuedAccessCode> for IssuedTempCodeResponse {
    fn from(value: IssuedAccessCode) -> Self {
        Self {
            code: value.code,
            access_code: TempCodeResponse::from(value.access_code),
        }
    }
}

impl From<OverlayGrant> for ActivatedGrantResponse {
    fn from(value: OverlayGrant) -> Self {
        Self {
            permission: value.permission_name.as_str().to_owned(),
            expires_at: value.expires_at.to_rfc3339(),
        }
    }
}

impl From<AccessRequest> for AccessRequestResponse {
    fn from(value: AccessRequest) -> Self {
        Self {
            request_id: value.request_id.to_string(),
            user_id: value.user_id.to_string(),
            permission: value.permission_name.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            requested_at: value.requested_at.to_rfc3339(),
            approved_by: value.approved_by.map(|user_id| user_id.to_string()),
            approved_at: value.approved_at.map(|approved_at| approved_at.to_rfc3339()),
        }
    }
}

impl From<AccessRequestSubmission> for SubmitAccessRequestResponse {
    fn from(value: AccessRequestSubmission) -> Self {
        match value {
            AccessRequestSubmission::Created(request) => Self {
                request: AccessRequestResponse::from(request),
                already_pending: false,
            },
            AccessRequestSubmission::AlreadyPending(request) => Self {
                request: AccessRequestResponse::from(request),
                already_pending: true,
            },
        }
    }
}

impl From<AccessRequestOutcome> for ResolvedAccessRequestResponse {
    fn from(value: AccessRequestOutcome) -> Self {
        Self {
            request: AccessRequestResponse::from(value.request),
            issued_code: value.issued_code.map(TempCodeResponse::from),
        }
    }
}
