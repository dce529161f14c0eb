use std::sync::Arc;

use medgate_core::{AppError, AppResult};
use medgate_domain::{
    AccessCodeFormat, AccessCodeTerms, AccessRequest, AccessRequestId, AccessRequestResolution,
    AccessRequestStatus, AuditAction, OverlayGrant, PermissionName, SystemPermission,
    TemporaryAccessCode,
};

use crate::security_ports::record_audit_event;
use crate::{
    AccessRequestQuery, AccessRequestRepository, AccessRequestSubmission, AuditEvent,
    AuditRepository, AuthorizationService, Clock, NotificationChannel, NotificationEvent,
    NotificationPublisher, OverlayGrantInbox, SecurityAdminRepository, SessionContext,
    TemporaryAccessService,
};

/// Default validity of the grant minted on approval.
pub const DEFAULT_ACCESS_REQUEST_GRANT_MINUTES: u32 = 60;

/// Result of resolving an access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequestOutcome {
    /// Request in its terminal state.
    pub request: AccessRequest,
    /// Code minted on approval.
    pub issued_code: Option<TemporaryAccessCode>,
}

/// Application service for the request and approval workflow.
#[derive(Clone)]
pub struct AccessRequestService {
    authorization_service: AuthorizationService,
    temporary_access_service: TemporaryAccessService,
    admin_repository: Arc<dyn SecurityAdminRepository>,
    request_repository: Arc<dyn AccessRequestRepository>,
    overlay_inbox: Arc<dyn OverlayGrantInbox>,
    notification_publisher: Arc<dyn NotificationPublisher>,
    audit_repository: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
    grant_duration_minutes: u32,
}

/// Collaborators required by [`AccessRequestService`].
pub struct AccessRequestServiceDependencies {
    /// Permission checks.
    pub authorization_service: AuthorizationService,
    /// Code issuance on approval.
    pub temporary_access_service: TemporaryAccessService,
    /// Permission and user lookups.
    pub admin_repository: Arc<dyn SecurityAdminRepository>,
    /// Request storage.
    pub request_repository: Arc<dyn AccessRequestRepository>,
    /// Grant delivery to the requester's session.
    pub overlay_inbox: Arc<dyn OverlayGrantInbox>,
    /// Real-time fan-out.
    pub notification_publisher: Arc<dyn NotificationPublisher>,
    /// Audit sink.
    pub audit_repository: Arc<dyn AuditRepository>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl AccessRequestService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(dependencies: AccessRequestServiceDependencies) -> Self {
        Self {
            authorization_service: dependencies.authorization_service,
            temporary_access_service: dependencies.temporary_access_service,
            admin_repository: dependencies.admin_repository,
            request_repository: dependencies.request_repository,
            overlay_inbox: dependencies.overlay_inbox,
            notification_publisher: dependencies.notification_publisher,
            audit_repository: dependencies.audit_repository,
            clock: dependencies.clock,
            grant_duration_minutes: DEFAULT_ACCESS_REQUEST_GRANT_MINUTES,
        }
    }

    /// Overrides how long approval grants last.
    #[must_use]
    pub fn with_grant_duration_minutes(mut self, grant_duration_minutes: u32) -> Self {
        self.grant_duration_minutes = grant_duration_minutes;
        self
    }

    /// Asks for a permission on behalf of the signed-in user.
    ///
    /// A second request while one is pending is reported as
    /// [`AccessRequestSubmission::AlreadyPending`] and stores nothing.
    pub async fn submit_access_request(
        &self,
        session: &SessionContext,
        permission_name: &str,
    ) -> AppResult<AccessRequestSubmission> {
        let permission_name = PermissionName::new(permission_name)?;
        let permission = self
            .admin_repository
            .find_permission_by_name(permission_name.as_str())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("permission '{permission_name}' does not exist"))
            })?;

        let submission = self
            .request_repository
            .submit_request(AccessRequest::pending(
                session.user_id(),
                &permission,
                self.clock.now(),
            ))
            .await?;

        let request = match &submission {
            AccessRequestSubmission::AlreadyPending(request) => {
                tracing::info!(
                    request_id = %request.request_id,
                    user_id = %request.user_id,
                    permission = %request.permission_name,
                    "access request already pending"
                );
                return Ok(submission);
            }
            AccessRequestSubmission::Created(request) => request,
        };

        tracing::info!(
            request_id = %request.request_id,
            user_id = %request.user_id,
            permission = %request.permission_name,
            "submitted access request"
        );

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(session.user_id()),
                action: AuditAction::RequestAccess,
                resource_type: "access_request".to_owned(),
                resource_id: request.request_id.to_string(),
                detail: Some(format!(
                    "requested permission '{}'",
                    request.permission_name
                )),
            },
        )
        .await?;

        self.notify(
            NotificationChannel::approvers(),
            NotificationEvent::NewAccessRequest {
                request_id: request.request_id.to_string(),
                requester: session.identity().display_name().to_owned(),
                permission: request.permission_name.to_string(),
                timestamp: request.requested_at.to_rfc3339(),
            },
        )
        .await;

        Ok(submission)
    }

    /// Approves or denies a pending request.
    ///
    /// Approval mints a reusable code for the requester and delivers the
    /// matching grant to their session without requiring activation. When
    /// either step fails the request goes back to pending so it can be
    /// approved again.
    pub async fn resolve_access_request(
        &self,
        actor: &SessionContext,
        request_id: AccessRequestId,
        resolution: AccessRequestResolution,
    ) -> AppResult<AccessRequestOutcome> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageAccessRequests)
            .await?;

        let request = self
            .request_repository
            .resolve_request(request_id, resolution, actor.user_id(), self.clock.now())
            .await?;

        tracing::info!(
            %request_id,
            status = request.status.as_str(),
            resolved_by = %actor.user_id(),
            "resolved access request"
        );

        let issued_code = match resolution {
            AccessRequestResolution::Approve => {
                match self.grant_approved_request(actor, &request).await {
                    Ok(access_code) => Some(access_code),
                    Err(error) => {
                        self.reopen_after_failed_grant(request_id, &error).await;
                        return Err(error);
                    }
                }
            }
            AccessRequestResolution::Deny => None,
        };

        let (action, verb) = match resolution {
            AccessRequestResolution::Approve => (AuditAction::ApproveAccessRequest, "approved"),
            AccessRequestResolution::Deny => (AuditAction::DenyAccessRequest, "denied"),
        };

        record_audit_event(
            self.audit_repository.as_ref(),
            AuditEvent {
                actor: Some(actor.user_id()),
                action,
                resource_type: "access_request".to_owned(),
                resource_id: request_id.to_string(),
                detail: Some(format!(
                    "{verb} request for permission '{}' by user '{}'",
                    request.permission_name, request.user_id
                )),
            },
        )
        .await?;

        self.notify(
            NotificationChannel::User(request.user_id),
            NotificationEvent::AccessRequestStatusChanged {
                request_id: request_id.to_string(),
                status: request.status.as_str().to_owned(),
                permission: request.permission_name.to_string(),
                approver: actor.identity().display_name().to_owned(),
            },
        )
        .await;

        Ok(AccessRequestOutcome {
            request,
            issued_code,
        })
    }

    /// Lists pending requests for approvers, newest first.
    pub async fn list_pending_requests(
        &self,
        actor: &SessionContext,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<AccessRequest>> {
        self.authorization_service
            .require_permission(actor, SystemPermission::ManageAccessRequests)
            .await?;

        self.request_repository
            .list_requests(AccessRequestQuery {
                status: Some(AccessRequestStatus::Pending),
                user_id: None,
                limit,
                offset,
            })
            .await
    }

    /// Lists the signed-in user's own requests, newest first.
    pub async fn list_my_requests(&self, session: &SessionContext) -> AppResult<Vec<AccessRequest>> {
        self.request_repository
            .list_requests(AccessRequestQuery {
                status: None,
                user_id: Some(session.user_id()),
                limit: 50,
                offset: 0,
            })
            .await
    }

    /// Mints the approval code and queues its grant for the requester.
    ///
    /// A code whose grant could not be queued is discarded again.
    async fn grant_approved_request(
        &self,
        actor: &SessionContext,
        request: &AccessRequest,
    ) -> AppResult<TemporaryAccessCode> {
        let approved_at = request.approved_at.ok_or_else(|| {
            AppError::Internal(format!(
                "approved access request '{}' has no approval time",
                request.request_id
            ))
        })?;

        let issued = self
            .temporary_access_service
            .issue_code(
                AccessCodeTerms {
                    user_id: request.user_id,
                    permission_id: request.permission_id,
                    permission_name: request.permission_name.clone(),
                    duration_minutes: self.grant_duration_minutes,
                    is_single_use: false,
                    issued_by: Some(actor.user_id()),
                },
                AccessCodeFormat::UrlSafe,
                approved_at,
            )
            .await?;

        let delivered = self
            .overlay_inbox
            .deliver(
                request.user_id,
                OverlayGrant {
                    permission_name: issued.access_code.permission_name.clone(),
                    expires_at: issued.access_code.expires_at,
                },
            )
            .await;

        if let Err(error) = delivered {
            self.temporary_access_service
                .discard_code(issued.access_code.code_id)
                .await;
            return Err(error);
        }

        Ok(issued.access_code)
    }

    async fn reopen_after_failed_grant(&self, request_id: AccessRequestId, cause: &AppError) {
        match self.request_repository.reopen_request(request_id).await {
            Ok(_) => tracing::warn!(
                %request_id,
                error = %cause,
                "returned access request to pending after failed grant"
            ),
            Err(error) => tracing::error!(
                %request_id,
                cause = %cause,
                %error,
                "failed to return access request to pending after failed grant"
            ),
        }
    }

    async fn notify(&self, channel: NotificationChannel, event: NotificationEvent) {
        let event_name = event.event_name();
        if let Err(error) = self
            .notification_publisher
            .publish(channel.clone(), event)
            .await
        {
            tracing::warn!(%channel, event = event_name, %error, "dropped notification");
        }
    }
}
