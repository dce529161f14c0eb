use std::sync::Arc;

use medgate_core::{AppResult, UserId};
use medgate_domain::{OverlayGrant, SessionPermissionOverlay};

use crate::{Clock, OverlayGrantInbox, SessionContext};

/// Grants folded into a session overlay by [`SessionOverlayService::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayRefresh {
    /// Grants read from the inbox. Acknowledge them once the overlay is stored.
    pub delivered: Vec<OverlayGrant>,
    /// Whether the overlay differs from the one that was loaded.
    pub changed: bool,
}

/// Keeps a session overlay in step with grants delivered out of band.
#[derive(Clone)]
pub struct SessionOverlayService {
    inbox: Arc<dyn OverlayGrantInbox>,
    clock: Arc<dyn Clock>,
}

impl SessionOverlayService {
    /// Creates a new service.
    #[must_use]
    pub fn new(inbox: Arc<dyn OverlayGrantInbox>, clock: Arc<dyn Clock>) -> Self {
        Self { inbox, clock }
    }

    /// Merges grants queued for the session's user and drops expired entries.
    ///
    /// The grants stay queued until [`Self::acknowledge`] is called, so the
    /// caller acknowledges only after the overlay was stored.
    pub async fn refresh(&self, session: &mut SessionContext) -> AppResult<OverlayRefresh> {
        let delivered = self.inbox.pending(session.user_id()).await?;

        let mut incoming = SessionPermissionOverlay::new();
        for grant in &delivered {
            incoming.apply(grant.clone());
        }

        let merged = session.overlay_mut().merge(&incoming);
        let pruned = session.overlay_mut().prune_expired(self.clock.now());
        if merged {
            tracing::info!(
                user_id = %session.user_id(),
                delivered = delivered.len(),
                "merged delivered grants into session"
            );
        }

        Ok(OverlayRefresh {
            delivered,
            changed: merged || pruned > 0,
        })
    }

    /// Removes grants from the inbox once a stored overlay holds them.
    pub async fn acknowledge(&self, user_id: UserId, delivered: &[OverlayGrant]) -> AppResult<()> {
        if delivered.is_empty() {
            return Ok(());
        }

        self.inbox.acknowledge(user_id, delivered).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use medgate_core::{UserId, UserIdentity};
    use medgate_domain::OverlayGrant;

    use crate::test_support::{FakeOverlayGrantInbox, FixedClock, permission_name};
    use crate::{Clock, OverlayGrantInbox, SessionContext};

    use super::SessionOverlayService;

    #[tokio::test]
    async fn grants_stay_queued_until_acknowledged() {
        let clock = Arc::new(FixedClock::default());
        let inbox = Arc::new(FakeOverlayGrantInbox::default());
        let service = SessionOverlayService::new(inbox.clone(), clock.clone());
        let user_id = UserId::new();
        let grant = OverlayGrant {
            permission_name: permission_name("view_sensitive_data"),
            expires_at: clock.now() + Duration::minutes(60),
        };
        assert!(inbox.deliver(user_id, grant.clone()).await.is_ok());

        // A session whose write never landed sees the same grant again.
        let mut lost = SessionContext::without_overlay(UserIdentity::new(user_id, "Dana"));
        let first = service.refresh(&mut lost).await.unwrap_or_default();
        assert!(first.changed);
        assert_eq!(first.delivered, vec![grant.clone()]);

        let mut session = SessionContext::without_overlay(UserIdentity::new(user_id, "Dana"));
        let second = service.refresh(&mut session).await.unwrap_or_default();
        assert!(second.changed);
        assert!(session.overlay().is_granted("view_sensitive_data", clock.now()));

        assert!(service.acknowledge(user_id, &second.delivered).await.is_ok());
        let third = service.refresh(&mut session).await.unwrap_or_default();
        assert!(third.delivered.is_empty());
        assert!(!third.changed);
    }

    #[tokio::test]
    async fn redelivered_grant_does_not_mark_overlay_changed() {
        let clock = Arc::new(FixedClock::default());
        let inbox = Arc::new(FakeOverlayGrantInbox::default());
        let service = SessionOverlayService::new(inbox.clone(), clock.clone());
        let user_id = UserId::new();
        let expires_at = clock.now() + Duration::minutes(60);
        let mut session = SessionContext::without_overlay(UserIdentity::new(user_id, "Dana"));
        session
            .overlay_mut()
            .grant(permission_name("view_sensitive_data"), expires_at);

        let delivered = inbox
            .deliver(
                user_id,
                OverlayGrant {
                    permission_name: permission_name("view_sensitive_data"),
                    expires_at,
                },
            )
            .await;
        assert!(delivered.is_ok());

        let refresh = service.refresh(&mut session).await.unwrap_or_default();
        assert_eq!(refresh.delivered.len(), 1);
        assert!(!refresh.changed);
    }

    #[tokio::test]
    async fn refresh_prunes_expired_entries() {
        let clock = Arc::new(FixedClock::default());
        let service =
            SessionOverlayService::new(Arc::new(FakeOverlayGrantInbox::default()), clock.clone());
        let mut session =
            SessionContext::without_overlay(UserIdentity::new(UserId::new(), "Dana"));
        session
            .overlay_mut()
            .grant(permission_name("edit_patient"), clock.now() + Duration::minutes(1));

        clock.advance(Duration::minutes(2));

        assert!(service.refresh(&mut session).await.unwrap_or_default().changed);
        assert!(session.overlay().is_empty());
    }
}
