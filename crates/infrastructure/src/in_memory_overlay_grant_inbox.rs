//! Process-local overlay grant inbox for single-replica deployments and tests.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use medgate_application::{Clock, OverlayGrantInbox};
use medgate_core::{AppResult, UserId};
use medgate_domain::OverlayGrant;

/// In-memory implementation of the overlay grant inbox port.
///
/// Expired grants are dropped whenever the user's queue is touched, and a
/// queue left empty is removed.
pub struct InMemoryOverlayGrantInbox {
    pending: DashMap<UserId, Vec<OverlayGrant>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryOverlayGrantInbox {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            pending: DashMap::new(),
            clock,
        }
    }

    fn drop_empty_queue(&self, user_id: UserId) {
        self.pending.remove_if(&user_id, |_, grants| grants.is_empty());
    }
}

#[async_trait]
impl OverlayGrantInbox for InMemoryOverlayGrantInbox {
    async fn deliver(&self, user_id: UserId, grant: OverlayGrant) -> AppResult<()> {
        let now = self.clock.now();
        let mut grants = self.pending.entry(user_id).or_default();
        grants.retain(|queued| queued.expires_at > now);
        if grant.expires_at > now {
            grants.push(grant);
        }
        drop(grants);

        self.drop_empty_queue(user_id);
        Ok(())
    }

    async fn pending(&self, user_id: UserId) -> AppResult<Vec<OverlayGrant>> {
        Ok(self
            .pending
            .get(&user_id)
            .map(|grants| grants.clone())
            .unwrap_or_default())
    }

    async fn acknowledge(&self, user_id: UserId, grants: &[OverlayGrant]) -> AppResult<()> {
        if let Some(mut queued) = self.pending.get_mut(&user_id) {
            for grant in grants {
                if let Some(index) = queued.iter().position(|candidate| candidate == grant) {
                    queued.remove(index);
                }
            }
        }

        self.drop_empty_queue(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use medgate_application::{OverlayGrantInbox, SystemClock};
    use medgate_core::UserId;
    use medgate_domain::{OverlayGrant, PermissionName};

    use super::InMemoryOverlayGrantInbox;

    fn grant(permission: &str, minutes: i64) -> OverlayGrant {
        OverlayGrant {
            permission_name: PermissionName::new(permission)
                .unwrap_or_else(|_| panic!("valid permission")),
            expires_at: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn grants_stay_queued_until_acknowledged() {
        let inbox = InMemoryOverlayGrantInbox::new(Arc::new(SystemClock));
        let requester = UserId::new();
        let bystander = UserId::new();

        assert!(inbox.deliver(requester, grant("edit_patient", 60)).await.is_ok());
        assert!(inbox.deliver(requester, grant("upload_data", 60)).await.is_ok());

        assert!(inbox.pending(bystander).await.is_ok_and(|grants| grants.is_empty()));
        let queued = inbox.pending(requester).await.unwrap_or_default();
        assert_eq!(queued.len(), 2);
        assert_eq!(inbox.pending(requester).await.unwrap_or_default(), queued);

        assert!(inbox.acknowledge(requester, &queued[..1]).await.is_ok());
        assert_eq!(inbox.pending(requester).await.unwrap_or_default(), queued[1..]);

        assert!(inbox.acknowledge(requester, &queued[1..]).await.is_ok());
        assert!(inbox.pending.is_empty());
    }

    #[tokio::test]
    async fn expired_grants_are_dropped_on_delivery() {
        let inbox = InMemoryOverlayGrantInbox::new(Arc::new(SystemClock));
        let user_id = UserId::new();

        assert!(inbox.deliver(user_id, grant("edit_patient", -1)).await.is_ok());
        assert!(inbox.pending.is_empty());

        inbox
            .pending
            .entry(user_id)
            .or_default()
            .push(grant("upload_data", -5));
        assert!(inbox.deliver(user_id, grant("edit_patient", 30)).await.is_ok());

        let queued = inbox.pending(user_id).await.unwrap_or_default();
        assert_eq!(
            queued
                .iter()
                .map(|grant| grant.permission_name.as_str())
                .collect::<Vec<_>>(),
            vec!["edit_patient"]
        );
    }
}
