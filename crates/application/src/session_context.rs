use medgate_core::{UserId, UserIdentity};
use medgate_domain::SessionPermissionOverlay;

/// Authenticated caller plus the temporary grants held by their session.
///
/// Built by the transport layer when it validates the session and handed to
/// every service call that needs an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    identity: UserIdentity,
    overlay: SessionPermissionOverlay,
}

impl SessionContext {
    /// Creates a context from an identity and its session overlay.
    #[must_use]
    pub fn new(identity: UserIdentity, overlay: SessionPermissionOverlay) -> Self {
        Self { identity, overlay }
    }

    /// Creates a context with no temporary grants.
    #[must_use]
    pub fn without_overlay(identity: UserIdentity) -> Self {
        Self::new(identity, SessionPermissionOverlay::new())
    }

    /// Returns the authenticated identity.
    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Returns the authenticated user id.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.identity.user_id()
    }

    /// Returns the session overlay.
    #[must_use]
    pub fn overlay(&self) -> &SessionPermissionOverlay {
        &self.overlay
    }

    /// Returns the session overlay for mutation.
    pub fn overlay_mut(&mut self) -> &mut SessionPermissionOverlay {
        &mut self.overlay
    }
}
