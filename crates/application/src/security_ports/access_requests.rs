use async_trait::async_trait;
use chrono::{DateTime, Utc};

use medgate_core::{AppResult, UserId};
use medgate_domain::{AccessRequest, AccessRequestId, AccessRequestResolution, AccessRequestStatus};

/// Outcome of submitting an access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequestSubmission {
    /// A new pending request was stored.
    Created(AccessRequest),
    /// A pending request for the same user and permission already exists.
    AlreadyPending(AccessRequest),
}

impl AccessRequestSubmission {
    /// Returns the stored request.
    #[must_use]
    pub fn request(&self) -> &AccessRequest {
        match self {
            Self::Created(request) | Self::AlreadyPending(request) => request,
        }
    }
}

/// Query parameters for access request listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequestQuery {
    /// Optional status filter.
    pub status: Option<AccessRequestStatus>,
    /// Optional requester filter.
    pub user_id: Option<UserId>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for pagination.
    pub offset: usize,
}

/// Repository port for access requests.
#[async_trait]
pub trait AccessRequestRepository: Send + Sync {
    /// Stores a pending request unless one already exists for the same user
    /// and permission. The check and insert are atomic.
    async fn submit_request(&self, request: AccessRequest) -> AppResult<AccessRequestSubmission>;

    /// Finds one request.
    async fn find_request(&self, request_id: AccessRequestId) -> AppResult<Option<AccessRequest>>;

    /// Locks a request and moves it to its terminal state.
    ///
    /// Returns `NotFound` when absent and `AlreadyResolved` when it is no
    /// longer pending.
    async fn resolve_request(
        &self,
        request_id: AccessRequestId,
        resolution: AccessRequestResolution,
        approver: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<AccessRequest>;

    /// Returns an approved request to pending and clears its approval fields.
    ///
    /// Used when the grant for an approval could not be issued. Returns
    /// `Conflict` when the request is no longer approved.
    async fn reopen_request(&self, request_id: AccessRequestId) -> AppResult<AccessRequest>;

    /// Lists requests, newest first.
    async fn list_requests(&self, query: AccessRequestQuery) -> AppResult<Vec<AccessRequest>>;
}
