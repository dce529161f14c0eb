use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::Serialize;

use medgate_core::{AppResult, UserId};
use medgate_domain::OverlayGrant;

/// Group channel joined by users who can resolve access requests.
pub const APPROVERS_GROUP: &str = "admins";

/// Addressable notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationChannel {
    /// Channel private to one user.
    User(UserId),
    /// Named group channel.
    Group(String),
}

impl NotificationChannel {
    /// Returns the approvers group channel.
    #[must_use]
    pub fn approvers() -> Self {
        Self::Group(APPROVERS_GROUP.to_owned())
    }
}

impl Display for NotificationChannel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(user_id) => write!(formatter, "user:{user_id}"),
            Self::Group(name) => write!(formatter, "group:{name}"),
        }
    }
}

/// Real-time events pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A user asked for a permission.
    NewAccessRequest {
        /// Request id.
        request_id: String,
        /// Requester display name.
        requester: String,
        /// Requested permission name.
        permission: String,
        /// Submission timestamp in RFC3339.
        timestamp: String,
    },
    /// An access request was approved or denied.
    AccessRequestStatusChanged {
        /// Request id.
        request_id: String,
        /// New status.
        status: String,
        /// Requested permission name.
        permission: String,
        /// Approver display name.
        approver: String,
    },
}

impl NotificationEvent {
    /// Returns the event name used on the wire.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::NewAccessRequest { .. } => "new_access_request",
            Self::AccessRequestStatusChanged { .. } => "access_request_status_changed",
        }
    }
}

/// Port for fan-out of real-time notifications.
///
/// Delivery is best effort. Having no subscribers is not an error.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Publishes one event to a channel.
    async fn publish(&self, channel: NotificationChannel, event: NotificationEvent)
    -> AppResult<()>;
}

/// Port delivering temporary grants into a user's sessions.
///
/// Grants are addressed to a user because the approver's request has no
/// handle on the requester's session. A session reads the queued grants,
/// stores them in its overlay and only then acknowledges them, so a failed
/// session write leaves them queued for the next request.
#[async_trait]
pub trait OverlayGrantInbox: Send + Sync {
    /// Queues a grant for the user.
    async fn deliver(&self, user_id: UserId, grant: OverlayGrant) -> AppResult<()>;

    /// Returns the grants queued for the user without removing them.
    async fn pending(&self, user_id: UserId) -> AppResult<Vec<OverlayGrant>>;

    /// Removes grants a session has stored.
    async fn acknowledge(&self, user_id: UserId, grants: &[OverlayGrant]) -> AppResult<()>;
}
