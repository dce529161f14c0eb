//! In-memory port implementations shared by service tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Mutex;

use medgate_core::{AppError, AppResult, UserId, UserIdentity};
use medgate_domain::{
    ADMIN_ROLE_NAME, AccessCodeId, AccessRequest, AccessRequestId, AccessRequestResolution,
    AccessRequestStatus, AuditAction, DEFAULT_ROLE_NAME, OverlayGrant, Permission, PermissionId,
    PermissionName, Role, RoleId, RoleName, SystemPermission, TemporaryAccessCode, User,
};

use crate::{
    AccessCodeQuery, AccessCodeRepository, AccessRequestQuery, AccessRequestRepository,
    AccessRequestService, AccessRequestServiceDependencies, AccessRequestSubmission, AuditEvent,
    AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository, AuthorizationRepository,
    AuthorizationService, Clock, NotificationChannel, NotificationEvent, NotificationPublisher,
    OverlayGrantInbox, SaveRoleInput, SecurityAdminRepository, SecurityAdminService,
    SessionContext, SessionOverlayService, TemporaryAccessService, UserProvisioning,
};

pub(crate) fn permission_name(value: &str) -> PermissionName {
    PermissionName::new(value).unwrap_or_else(|_| panic!("valid permission name '{value}'"))
}

fn role_name(value: &str) -> RoleName {
    RoleName::new(value).unwrap_or_else(|_| panic!("valid role name '{value}'"))
}

pub(crate) struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl Default for FixedClock {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("valid start time"));
        Self {
            now: std::sync::Mutex::new(start),
        }
    }
}

impl FixedClock {
    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct StoredUser {
    user_id: UserId,
    display_name: String,
    role_ids: Vec<RoleId>,
}

#[derive(Default)]
struct DirectoryState {
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    users: Vec<StoredUser>,
}

impl DirectoryState {
    fn build_user(&self, stored: &StoredUser) -> User {
        User {
            user_id: stored.user_id,
            display_name: stored.display_name.clone(),
            roles: self
                .roles
                .iter()
                .filter(|role| stored.role_ids.contains(&role.role_id))
                .cloned()
                .collect(),
        }
    }

    fn role_permissions(&self, permission_ids: &[PermissionId]) -> Vec<PermissionName> {
        self.permissions
            .iter()
            .filter(|permission| permission_ids.contains(&permission.permission_id))
            .map(|permission| permission.name.clone())
            .collect()
    }

    fn ensure_unique_role_name(&self, name: &RoleName, except: Option<RoleId>) -> AppResult<()> {
        if self
            .roles
            .iter()
            .any(|role| &role.name == name && Some(role.role_id) != except)
        {
            return Err(AppError::Conflict(format!("role '{name}' already exists")));
        }
        Ok(())
    }
}

/// Permission catalogue, roles and users.
pub(crate) struct FakeDirectory {
    state: Mutex<DirectoryState>,
}

impl FakeDirectory {
    pub(crate) fn seeded() -> Self {
        let permissions: Vec<Permission> = SystemPermission::all()
            .iter()
            .map(|permission| Permission {
                permission_id: PermissionId::new(),
                name: permission_name(permission.as_str()),
            })
            .collect();
        let roles = vec![
            Role {
                role_id: RoleId::new(),
                name: role_name(ADMIN_ROLE_NAME),
                is_protected: true,
                permissions: permissions
                    .iter()
                    .map(|permission| permission.name.clone())
                    .collect(),
            },
            Role {
                role_id: RoleId::new(),
                name: role_name(DEFAULT_ROLE_NAME),
                is_protected: true,
                permissions: Vec::new(),
            },
        ];

        Self {
            state: Mutex::new(DirectoryState {
                permissions,
                roles,
                users: Vec::new(),
            }),
        }
    }

    pub(crate) async fn add_role(&self, name: &str, permissions: &[&str]) -> RoleId {
        let role_id = RoleId::new();
        self.state.lock().await.roles.push(Role {
            role_id,
            name: role_name(name),
            is_protected: false,
            permissions: permissions
                .iter()
                .map(|permission| permission_name(permission))
                .collect(),
        });
        role_id
    }

    pub(crate) async fn add_user(&self, display_name: &str, role_names: &[&str]) -> UserId {
        let user_id = UserId::new();
        let mut state = self.state.lock().await;
        let role_ids = state
            .roles
            .iter()
            .filter(|role| role_names.contains(&role.name.as_str()))
            .map(|role| role.role_id)
            .collect();
        state.users.push(StoredUser {
            user_id,
            display_name: display_name.to_owned(),
            role_ids,
        });
        user_id
    }

    pub(crate) async fn permission(&self, name: &str) -> Permission {
        self.state
            .lock()
            .await
            .permissions
            .iter()
            .find(|permission| permission.name.as_str() == name)
            .cloned()
            .unwrap_or_else(|| panic!("permission '{name}' is seeded"))
    }

    pub(crate) async fn role_id(&self, name: &str) -> RoleId {
        self.state
            .lock()
            .await
            .roles
            .iter()
            .find(|role| role.name.as_str() == name)
            .map(|role| role.role_id)
            .unwrap_or_else(|| panic!("role '{name}' exists"))
    }
}

#[async_trait]
impl AuthorizationRepository for FakeDirectory {
    async fn list_permissions_for_user(&self, user_id: UserId) -> AppResult<Vec<PermissionName>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.user_id == user_id)
            .map(|user| state.build_user(user).effective_permissions().into_iter().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl SecurityAdminRepository for FakeDirectory {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.state.lock().await.permissions.clone())
    }

    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .find(|permission| permission.name.as_str() == name)
            .cloned())
    }

    async fn find_permission_by_id(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .find(|permission| permission.permission_id == permission_id)
            .cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.state.lock().await.roles.clone())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .iter()
            .find(|role| role.role_id == role_id)
            .cloned())
    }

    async fn create_role(&self, input: SaveRoleInput) -> AppResult<Role> {
        let mut state = self.state.lock().await;
        state.ensure_unique_role_name(&input.name, None)?;
        let role = Role {
            role_id: RoleId::new(),
            name: input.name,
            is_protected: false,
            permissions: state.role_permissions(&input.permission_ids),
        };
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, role_id: RoleId, input: SaveRoleInput) -> AppResult<Role> {
        let mut state = self.state.lock().await;
        state.ensure_unique_role_name(&input.name, Some(role_id))?;
        let permissions = state.role_permissions(&input.permission_ids);
        let role = state
            .roles
            .iter_mut()
            .find(|role| role.role_id == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
        role.name = input.name;
        role.permissions = permissions;
        Ok(role.clone())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.roles.retain(|role| role.role_id != role_id);
        for user in &mut state.users {
            user.role_ids.retain(|assigned| *assigned != role_id);
        }
        Ok(())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .map(|user| state.build_user(user))
            .collect())
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.user_id == user_id)
            .map(|user| state.build_user(user)))
    }

    async fn ensure_user(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> AppResult<UserProvisioning> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.users.iter().find(|user| user.user_id == user_id) {
            return Ok(UserProvisioning::Existing(state.build_user(existing)));
        }

        let role_ids = state
            .roles
            .iter()
            .filter(|role| role.name.as_str() == DEFAULT_ROLE_NAME)
            .map(|role| role.role_id)
            .collect();
        let stored = StoredUser {
            user_id,
            display_name: display_name.to_owned(),
            role_ids,
        };
        let user = state.build_user(&stored);
        state.users.push(stored);
        Ok(UserProvisioning::Created(user))
    }

    async fn set_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> AppResult<User> {
        let mut state = self.state.lock().await;
        let position = state
            .users
            .iter()
            .position(|user| user.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))?;
        state.users[position].role_ids = role_ids.to_vec();
        Ok(state.build_user(&state.users[position]))
    }
}

#[derive(Default)]
pub(crate) struct FakeAccessCodeRepository {
    pub(crate) codes: Mutex<Vec<TemporaryAccessCode>>,
    forced_collisions: Mutex<usize>,
}

impl FakeAccessCodeRepository {
    pub(crate) async fn force_collisions(&self, count: usize) {
        *self.forced_collisions.lock().await = count;
    }

    pub(crate) async fn stored_count(&self) -> usize {
        self.codes.lock().await.len()
    }

    pub(crate) async fn find(&self, code_id: AccessCodeId) -> Option<TemporaryAccessCode> {
        self.codes
            .lock()
            .await
            .iter()
            .find(|code| code.code_id == code_id)
            .cloned()
    }
}

#[async_trait]
impl AccessCodeRepository for FakeAccessCodeRepository {
    async fn insert_code(&self, code: TemporaryAccessCode) -> AppResult<()> {
        let mut forced_collisions = self.forced_collisions.lock().await;
        if *forced_collisions > 0 {
            *forced_collisions -= 1;
            return Err(AppError::Conflict("code hash already exists".to_owned()));
        }

        let mut codes = self.codes.lock().await;
        if codes.iter().any(|existing| existing.code_hash == code.code_hash) {
            return Err(AppError::Conflict("code hash already exists".to_owned()));
        }
        codes.push(code);
        Ok(())
    }

    async fn activate_code(
        &self,
        code_hash: &str,
        requesting_user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<TemporaryAccessCode> {
        let mut codes = self.codes.lock().await;
        let code = codes
            .iter_mut()
            .find(|code| code.code_hash == code_hash)
            .ok_or_else(|| AppError::NotFound("temporary access code does not exist".to_owned()))?;
        code.activate(requesting_user, now)?;
        Ok(code.clone())
    }

    async fn revoke_code(&self, code_id: AccessCodeId) -> AppResult<TemporaryAccessCode> {
        let mut codes = self.codes.lock().await;
        let code = codes
            .iter_mut()
            .find(|code| code.code_id == code_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("temporary access code '{code_id}' does not exist"))
            })?;
        code.revoke();
        Ok(code.clone())
    }

    async fn delete_code(&self, code_id: AccessCodeId) -> AppResult<()> {
        self.codes.lock().await.retain(|code| code.code_id != code_id);
        Ok(())
    }

    async fn list_codes(&self, query: AccessCodeQuery) -> AppResult<Vec<TemporaryAccessCode>> {
        let mut codes: Vec<TemporaryAccessCode> = self
            .codes
            .lock()
            .await
            .iter()
            .filter(|code| query.user_id.is_none_or(|user_id| code.user_id == user_id))
            .filter(|code| query.usable_at.is_none_or(|now| code.is_usable(now)))
            .cloned()
            .collect();
        codes.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(codes
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeAccessRequestRepository {
    pub(crate) requests: Mutex<Vec<AccessRequest>>,
}

#[async_trait]
impl AccessRequestRepository for FakeAccessRequestRepository {
    async fn submit_request(&self, request: AccessRequest) -> AppResult<AccessRequestSubmission> {
        let mut requests = self.requests.lock().await;
        if let Some(pending) = requests.iter().find(|existing| {
            existing.status == AccessRequestStatus::Pending
                && existing.user_id == request.user_id
                && existing.permission_id == request.permission_id
        }) {
            return Ok(AccessRequestSubmission::AlreadyPending(pending.clone()));
        }

        requests.push(request.clone());
        Ok(AccessRequestSubmission::Created(request))
    }

    async fn find_request(&self, request_id: AccessRequestId) -> AppResult<Option<AccessRequest>> {
        Ok(self
            .requests
            .lock()
            .await
            .iter()
            .find(|request| request.request_id == request_id)
            .cloned())
    }

    async fn resolve_request(
        &self,
        request_id: AccessRequestId,
        resolution: AccessRequestResolution,
        approver: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<AccessRequest> {
        let mut requests = self.requests.lock().await;
        let request = requests
            .iter_mut()
            .find(|request| request.request_id == request_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("access request '{request_id}' does not exist"))
            })?;
        request.resolve(resolution, approver, now)?;
        Ok(request.clone())
    }

    async fn reopen_request(&self, request_id: AccessRequestId) -> AppResult<AccessRequest> {
        let mut requests = self.requests.lock().await;
        let request = requests
            .iter_mut()
            .find(|request| request.request_id == request_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("access request '{request_id}' does not exist"))
            })?;
        request.reopen()?;
        Ok(request.clone())
    }

    async fn list_requests(&self, query: AccessRequestQuery) -> AppResult<Vec<AccessRequest>> {
        let mut requests: Vec<AccessRequest> = self
            .requests
            .lock()
            .await
            .iter()
            .filter(|request| query.status.is_none_or(|status| request.status == status))
            .filter(|request| query.user_id.is_none_or(|user_id| request.user_id == user_id))
            .cloned()
            .collect();
        requests.sort_by(|left, right| right.requested_at.cmp(&left.requested_at));
        Ok(requests
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
    failing: bool,
}

impl FakeAuditRepository {
    pub(crate) fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub(crate) async fn actions(&self) -> Vec<AuditAction> {
        self.events
            .lock()
            .await
            .iter()
            .map(|event| event.action)
            .collect()
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        if self.failing {
            return Err(AppError::Internal("audit sink unavailable".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditLogRepository {
    pub(crate) queries: Mutex<Vec<AuditLogQuery>>,
}

#[async_trait]
impl AuditLogRepository for FakeAuditLogRepository {
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        self.queries.lock().await.push(query);
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub(crate) struct FakeNotificationPublisher {
    pub(crate) published: Mutex<Vec<(NotificationChannel, NotificationEvent)>>,
}

#[async_trait]
impl NotificationPublisher for FakeNotificationPublisher {
    async fn publish(
        &self,
        channel: NotificationChannel,
        event: NotificationEvent,
    ) -> AppResult<()> {
        self.published.lock().await.push((channel, event));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeOverlayGrantInbox {
    grants: Mutex<HashMap<UserId, Vec<OverlayGrant>>>,
    failing_deliveries: Mutex<bool>,
}

impl FakeOverlayGrantInbox {
    pub(crate) async fn fail_deliveries(&self, failing: bool) {
        *self.failing_deliveries.lock().await = failing;
    }
}

#[async_trait]
impl OverlayGrantInbox for FakeOverlayGrantInbox {
    async fn deliver(&self, user_id: UserId, grant: OverlayGrant) -> AppResult<()> {
        if *self.failing_deliveries.lock().await {
            return Err(AppError::Internal("overlay inbox unavailable".to_owned()));
        }

        self.grants
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .push(grant);
        Ok(())
    }

    async fn pending(&self, user_id: UserId) -> AppResult<Vec<OverlayGrant>> {
        Ok(self
            .grants
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn acknowledge(&self, user_id: UserId, grants: &[OverlayGrant]) -> AppResult<()> {
        let mut queued = self.grants.lock().await;
        if let Some(pending) = queued.get_mut(&user_id) {
            for grant in grants {
                if let Some(index) = pending.iter().position(|queued| queued == grant) {
                    pending.remove(index);
                }
            }
            if pending.is_empty() {
                queued.remove(&user_id);
            }
        }
        Ok(())
    }
}

/// Fully wired services over the in-memory fakes.
pub(crate) struct TestHarness {
    pub(crate) clock: Arc<FixedClock>,
    pub(crate) directory: Arc<FakeDirectory>,
    pub(crate) codes: Arc<FakeAccessCodeRepository>,
    pub(crate) requests: Arc<FakeAccessRequestRepository>,
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) audit_log: Arc<FakeAuditLogRepository>,
    pub(crate) notifications: Arc<FakeNotificationPublisher>,
    pub(crate) inbox: Arc<FakeOverlayGrantInbox>,
    pub(crate) authorization_service: AuthorizationService,
    pub(crate) temporary_access_service: TemporaryAccessService,
    pub(crate) access_request_service: AccessRequestService,
    pub(crate) security_admin_service: SecurityAdminService,
    pub(crate) session_overlay_service: SessionOverlayService,
}

impl TestHarness {
    pub(crate) fn new() -> Self {
        Self::with_audit(FakeAuditRepository::default())
    }

    pub(crate) fn with_audit(audit: FakeAuditRepository) -> Self {
        let clock = Arc::new(FixedClock::default());
        let directory = Arc::new(FakeDirectory::seeded());
        let codes = Arc::new(FakeAccessCodeRepository::default());
        let requests = Arc::new(FakeAccessRequestRepository::default());
        let audit = Arc::new(audit);
        let audit_log = Arc::new(FakeAuditLogRepository::default());
        let notifications = Arc::new(FakeNotificationPublisher::default());
        let inbox = Arc::new(FakeOverlayGrantInbox::default());

        let authorization_service = AuthorizationService::new(directory.clone(), clock.clone());
        let temporary_access_service = TemporaryAccessService::new(
            authorization_service.clone(),
            directory.clone(),
            codes.clone(),
            audit.clone(),
            clock.clone(),
        );
        let access_request_service =
            AccessRequestService::new(AccessRequestServiceDependencies {
                authorization_service: authorization_service.clone(),
                temporary_access_service: temporary_access_service.clone(),
                admin_repository: directory.clone(),
                request_repository: requests.clone(),
                overlay_inbox: inbox.clone(),
                notification_publisher: notifications.clone(),
                audit_repository: audit.clone(),
                clock: clock.clone(),
            });
        let security_admin_service = SecurityAdminService::new(
            authorization_service.clone(),
            directory.clone(),
            audit_log.clone(),
            audit.clone(),
        );
        let session_overlay_service = SessionOverlayService::new(inbox.clone(), clock.clone());

        Self {
            clock,
            directory,
            codes,
            requests,
            audit,
            audit_log,
            notifications,
            inbox,
            authorization_service,
            temporary_access_service,
            access_request_service,
            security_admin_service,
            session_overlay_service,
        }
    }

    /// Creates a user with the named roles and returns an overlay-free session.
    pub(crate) async fn session_for(&self, display_name: &str, role_names: &[&str]) -> SessionContext {
        let user_id = self.directory.add_user(display_name, role_names).await;
        SessionContext::without_overlay(UserIdentity::new(user_id, display_name))
    }

    pub(crate) async fn admin(&self) -> SessionContext {
        self.session_for("Admin Ada", &[ADMIN_ROLE_NAME]).await
    }

    pub(crate) async fn clinician(&self) -> SessionContext {
        self.session_for("Clinician Cal", &[DEFAULT_ROLE_NAME]).await
    }
}
