use async_trait::async_trait;
use chrono::{DateTime, Utc};

use medgate_core::{AppResult, UserId};
use medgate_domain::{AccessCodeId, TemporaryAccessCode};

/// Query parameters for temporary access code listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCodeQuery {
    /// Optional owner filter.
    pub user_id: Option<UserId>,
    /// When set, only codes still usable at this instant are returned.
    pub usable_at: Option<DateTime<Utc>>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for pagination.
    pub offset: usize,
}

/// Repository port for temporary access codes.
#[async_trait]
pub trait AccessCodeRepository: Send + Sync {
    /// Persists a freshly issued code. A code hash collision yields `Conflict`.
    async fn insert_code(&self, code: TemporaryAccessCode) -> AppResult<()>;

    /// Locks the code matching `code_hash`, validates the attempt and records
    /// one activation atomically.
    ///
    /// Returns `NotFound` when no code matches. Validation failures leave the
    /// row untouched.
    async fn activate_code(
        &self,
        code_hash: &str,
        requesting_user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<TemporaryAccessCode>;

    /// Deactivates a code.
    async fn revoke_code(&self, code_id: AccessCodeId) -> AppResult<TemporaryAccessCode>;

    /// Removes a code whose plaintext never reached anyone.
    async fn delete_code(&self, code_id: AccessCodeId) -> AppResult<()>;

    /// Lists codes, newest first.
    async fn list_codes(&self, query: AccessCodeQuery) -> AppResult<Vec<TemporaryAccessCode>>;
}
