use std::sync::Arc;

use chrono::{DateTime, Utc};

use medgate_core::{AppError, AppResult, UserId};
use medgate_domain::{
    AccessCodeFormat, AccessCodeId, AccessCodeTerms, AuditAction, OverlayGrant, PermissionId,
    SystemPermission, TemporaryAccessCode,
};

use crate::security_ports::record_audit_event;
use crate::{
    AccessCodeQuery, AccessCodeRepository, AuditEvent, AuditRepository, AuthorizationService,
    Clock, SecurityAdminRepository, SessionContext,
};

mod code_crypto;

/// Default cap for administrator-issued code durations.
pub const DEFAULT_MAX_TEMP_CODE_MINUTES: u32 = 1440;

const MAX_ISSUE_ATTEMPTS: usize = 3;

/// Input payload for administrator-issued codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTempCodeInput {
    /// User the code is bound to.
    pub user_id: UserId,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Validity window in minutes.
    pub duration_minutes: u32,
    /// Whether the code may be activated only once.
    pub is_single_use: bool,
}

/// Freshly issued code. The plaintext is never retrievable again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedAccessCode {
    /// Plaintext code to hand to the user.
    pub code: String,
    /// Stored code row.
    pub access_code: TemporaryAccessCode,
}

/// Application service for temporary access codes.
#[derive(Clone)]
pub struct TemporaryAccessService {
    authorization_service: AuthorizationService,
    admin_repository: Arc<dyn SecurityAdminRepository>,
    code_repository: Arc<dyn AccessCodeRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
    max_duration_minutes: u32,
}

impl TemporaryAccessService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        admin_repository: Arc<dyn SecurityAdminRepository>,
        code_repository: Arc<dyn AccessCodeRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            authorization_service,
            admin_repository,
            code_repository,
            audit_repository,
            clock,
            max_duration_minutes: DEFAULT_MAX_TEMP_CODE_MINUTES,
        }
    }

    /// Overrides the cap for administrator-issued code durations.
    #[must_use]
    pub fn with_max_duration_minutes(mut self, max_duration_minutes: u32) -> Self {
        self.max_duration_minutes = max_duration_minutes;
        self
    }

    /// Issues a prefixed code on behalf of an administrator.
    pub async fn issue_temp_code(
        &self,
        actor: &SessionContext,
        input: IssueTempCodeInput,
    ) -> AppResult<IssuedAccessCode> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageTempCodes)
            .await?;

        if input.duration_minutes == 0 || input.duration_minutes > self.max_duration_minutes {
            return Err(AppError::Validation(format!(
                "duration_minutes must be between 1 and {}",
                self.max_duration_minutes
            )));
        }

        if self.admin_repository.find_user(input.user_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "user '{}' does not exist",
                input.user_id
            )));
        }

        let permission = self
            .admin_repository
            .find_permission_by_id(input.permission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "permission '{}' does not exist",
                    input.permission_id
                ))
            })?;

        self.issue_code(
            AccessCodeTerms {
                user_id: input.user_id,
                permission_id: permission.permission_id,
                permission_name: permission.name,
                duration_minutes: input.duration_minutes,
                is_single_use: input.is_single_use,
                issued_by: Some(actor.user_id()),
            },
            AccessCodeFormat::Prefixed,
            self.clock.now(),
        )
        .await
    }

    /// Generates, stores and audits a code. Hash collisions are retried.
    pub(crate) async fn issue_code(
        &self,
        terms: AccessCodeTerms,
        format: AccessCodeFormat,
        issued_at: DateTime<Utc>,
    ) -> AppResult<IssuedAccessCode> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let code = code_crypto::generate_code(format)?;
            let access_code = TemporaryAccessCode::issue(
                AccessCodeId::new(),
                code_crypto::hash_code(&code),
                code_crypto::code_hint(&code, format),
                terms.clone(),
                issued_at,
            )?;

            match self.code_repository.insert_code(access_code.clone()).await {
                Ok(()) => {
                    tracing::info!(
                        code_id = %access_code.code_id,
                        user_id = %access_code.user_id,
                        permission = %access_code.permission_name,
                        format = format.as_str(),
                        "issued temporary access code"
                    );

                    let audited = record_audit_event(
                        self.audit_repository.as_ref(),
                        AuditEvent {
                            actor: terms.issued_by,
                            action: AuditAction::GenerateTempCode,
                            resource_type: "temporary_access_code".to_owned(),
                            resource_id: access_code.code_id.to_string(),
                            detail: Some(format!(
                                "issued code '{}' for permission '{}' to user '{}' until {}",
                                access_code.code_hint,
                                access_code.permission_name,
                                access_code.user_id,
                                access_code.expires_at.to_rfc3339()
                            )),
                        },
                    )
                    .await;

                    // An unaudited code is never handed out, so it must not stay usable.
                    if let Err(error) = audited {
                        self.discard_code(access_code.code_id).await;
                        return Err(error);
                    }

                    return Ok(IssuedAccessCode { code, access_code });
                }
                Err(AppError::Conflict(message)) => {
                    tracing::warn!(attempt, %message, "temporary access code collision, retrying");
                }
                Err(error) => return Err(error),
            }
        }

        Err(AppError::Internal(format!(
            "failed to generate a unique temporary access code after {MAX_ISSUE_ATTEMPTS} attempts"
        )))
    }

    /// Deletes a stored code whose plaintext was never returned.
    ///
    /// Failures are logged only; the caller is already reporting the error
    /// that made the code useless.
    pub(crate) async fn discard_code(&self, code_id: AccessCodeId) {
        match self.code_repository.delete_code(code_id).await {
            Ok(()) => tracing::warn!(
                %code_id,
                "discarded temporary access code that was not handed out"
            ),
            Err(error) => tracing::error!(
                %code_id,
                %error,
                "failed to discard temporary access code that was not handed out"
            ),
        }
    }

    /// Redeems a code for the signed-in user and writes the grant into the
    /// session overlay.
    pub async fn activate_code(
        &self,
        session: &mut SessionContext,
        code: &str,
    ) -> AppResult<OverlayGrant> {
        let code = code_crypto::normalize_code(code);
        if code.is_empty() {
            return Err(AppError::Validation("no access code provided".to_owned()));
        }

        let user_id = session.user_id();
        let activated = self
            .code_repository
            .activate_code(&code_crypto::hash_code(&code), user_id, self.clock.now())
            .await
            .inspect_err(|error| {
                tracing::info!(%user_id, %error, "temporary access code activation rejected");
            })?;

        let grant = OverlayGrant {
            permission_name: activated.permission_name.clone(),
            expires_at: activated.expires_at,
        };
        session.overlay_mut().apply(grant.clone());

        tracing::info!(
            code_id = %activated.code_id,
            %user_id,
            permission = %activated.permission_name,
            "activated temporary access code"
        );

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(user_id),
                action: AuditAction::ActivateTempCode,
                resource_type: "temporary_access_code".to_owned(),
                resource_id: activated.code_id.to_string(),
                detail: Some(format!(
                    "activated code '{}' for permission '{}' (times_used={})",
                    activated.code_hint, activated.permission_name, activated.times_used
                )),
            },
        )
        .await?;

        Ok(grant)
    }

    /// Deactivates a code. Grants already written to sessions stay until
    /// they expire.
    pub async fn revoke_code(
        &self,
        actor: &SessionContext,
        code_id: AccessCodeId,
    ) -> AppResult<TemporaryAccessCode> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageTempCodes)
            .await?;

        let revoked = self.code_repository.revoke_code(code_id).await?;

        tracing::info!(%code_id, revoked_by = %actor.user_id(), "revoked temporary access code");

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(actor.user_id()),
                action: AuditAction::RevokeTempCode,
                resource_type: "temporary_access_code".to_owned(),
                resource_id: code_id.to_string(),
                detail: Some(format!(
                    "revoked code '{}' for permission '{}'",
                    revoked.code_hint, revoked.permission_name
                )),
            },
        )
        .await?;

        Ok(revoked)
    }

    /// Lists codes for administrators, newest first.
    pub async fn list_codes(
        &self,
        actor: &SessionContext,
        query: AccessCodeQuery,
    ) -> AppResult<Vec<TemporaryAccessCode>> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageTempCodes)
            .await?;

        self.code_repository.list_codes(query).await
    }

    /// Lists the signed-in user's codes that can still be activated.
    pub async fn list_active_codes_for_user(
        &self,
        session: &SessionContext,
    ) -> AppResult<Vec<TemporaryAccessCode>> {
        self.code_repository
            .list_codes(AccessCodeQuery {
                user_id: Some(session.user_id()),
                usable_at: Some(self.clock.now()),
                limit: 50,
                offset: 0,
            })
            .await
    }
}
