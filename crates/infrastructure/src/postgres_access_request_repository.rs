use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use medgate_application::{AccessRequestQuery, AccessRequestRepository, AccessRequestSubmission};
use medgate_core::{AppError, AppResult, UserId};
use medgate_domain::{
    AccessRequest, AccessRequestId, AccessRequestResolution, AccessRequestStatus, PermissionId,
    PermissionName,
};

use crate::map_unique_violation;

/// PostgreSQL-backed repository for access requests.
#[derive(Clone)]
pub struct PostgresAccessRequestRepository {
    pool: PgPool,
}

impl PostgresAccessRequestRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AccessRequestRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    permission_id: uuid::Uuid,
    permission_name: String,
    status: String,
    requested_at: DateTime<Utc>,
    approved_by: Option<uuid::Uuid>,
    approved_at: Option<DateTime<Utc>>,
}

impl TryFrom<AccessRequestRow> for AccessRequest {
    type Error = AppError;

    fn try_from(row: AccessRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            request_id: AccessRequestId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            permission_id: PermissionId::from_uuid(row.permission_id),
            permission_name: PermissionName::new(row.permission_name.as_str()).map_err(
                |error| {
                    AppError::Internal(format!(
                        "invalid stored permission '{}': {error}",
                        row.permission_name
                    ))
                },
            )?,
            status: row.status.parse::<AccessRequestStatus>().map_err(|error| {
                AppError::Internal(format!("invalid stored access request status: {error}"))
            })?,
            requested_at: row.requested_at,
            approved_by: row.approved_by.map(UserId::from_uuid),
            approved_at: row.approved_at,
        })
    }
}

const SELECT_REQUEST_COLUMNS: &str = r#"
    SELECT
        requests.id,
        requests.user_id,
        requests.permission_id,
        permissions.name AS permission_name,
        requests.status,
        requests.requested_at,
        requests.approved_by,
        requests.approved_at
    FROM access_requests requests
    INNER JOIN permissions ON permissions.id = requests.permission_id
"#;

impl PostgresAccessRequestRepository {
    async fn find_pending(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<AccessRequest>> {
        sqlx::query_as::<_, AccessRequestRow>(
            format!(
                "{SELECT_REQUEST_COLUMNS} WHERE requests.user_id = $1 \
                 AND requests.permission_id = $2 AND requests.status = 'pending'"
            )
            .as_str(),
        )
        .bind(user_id.as_uuid())
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find pending access request: {error}"))
        })?
        .map(AccessRequest::try_from)
        .transpose()
    }
}

#[async_trait]
impl AccessRequestRepository for PostgresAccessRequestRepository {
    async fn submit_request(&self, request: AccessRequest) -> AppResult<AccessRequestSubmission> {
        let inserted = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO access_requests (id, user_id, permission_id, status, requested_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, permission_id) WHERE status = 'pending' DO NOTHING
            RETURNING id
            "#,
        )
        .bind(request.request_id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(request.permission_id.as_uuid())
        .bind(request.status.as_str())
        .bind(request.requested_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to submit access request: {error}"))
        })?;

        if inserted.is_some() {
            return Ok(AccessRequestSubmission::Created(request));
        }

        // The conflicting pending row may have been resolved in between.
        self.find_pending(request.user_id, request.permission_id)
            .await?
            .map(AccessRequestSubmission::AlreadyPending)
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "access request for '{}' changed concurrently, retry",
                    request.permission_name
                ))
            })
    }

    async fn find_request(&self, request_id: AccessRequestId) -> AppResult<Option<AccessRequest>> {
        sqlx::query_as::<_, AccessRequestRow>(
            format!("{SELECT_REQUEST_COLUMNS} WHERE requests.id = $1").as_str(),
        )
        .bind(request_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find access request: {error}")))?
        .map(AccessRequest::try_from)
        .transpose()
    }

    async fn resolve_request(
        &self,
        request_id: AccessRequestId,
        resolution: AccessRequestResolution,
        approver: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<AccessRequest> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let row = sqlx::query_as::<_, AccessRequestRow>(
            format!("{SELECT_REQUEST_COLUMNS} WHERE requests.id = $1 FOR UPDATE OF requests")
                .as_str(),
        )
        .bind(request_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load access request: {error}")))?
        .ok_or_else(|| {
            AppError::NotFound(format!("access request '{request_id}' does not exist"))
        })?;

        let mut request = AccessRequest::try_from(row)?;
        request.resolve(resolution, approver, now)?;

        sqlx::query(
            r#"
            UPDATE access_requests
            SET status = $2, approved_by = $3, approved_at = $4
            WHERE id = $1
            "#,
        )
        .bind(request.request_id.as_uuid())
        .bind(request.status.as_str())
        .bind(request.approved_by.map(|user_id| user_id.as_uuid()))
        .bind(request.approved_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve access request: {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(request)
    }

    async fn reopen_request(&self, request_id: AccessRequestId) -> AppResult<AccessRequest> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let row = sqlx::query_as::<_, AccessRequestRow>(
            format!("{SELECT_REQUEST_COLUMNS} WHERE requests.id = $1 FOR UPDATE OF requests")
                .as_str(),
        )
        .bind(request_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load access request: {error}")))?
        .ok_or_else(|| {
            AppError::NotFound(format!("access request '{request_id}' does not exist"))
        })?;

        let mut request = AccessRequest::try_from(row)?;
        request.reopen()?;

        sqlx::query(
            r#"
            UPDATE access_requests
            SET status = $2, approved_by = NULL, approved_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(request.request_id.as_uuid())
        .bind(request.status.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                || format!("access request '{request_id}' was superseded by a new pending request"),
                "reopen access request",
            )
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(request)
    }

    async fn list_requests(&self, query: AccessRequestQuery) -> AppResult<Vec<AccessRequest>> {
        let limit = i64::try_from(query.limit.clamp(1, 200)).map_err(|error| {
            AppError::Validation(format!("invalid access request limit: {error}"))
        })?;
        let offset = i64::try_from(query.offset).map_err(|error| {
            AppError::Validation(format!("invalid access request offset: {error}"))
        })?;

        let rows = sqlx::query_as::<_, AccessRequestRow>(
            format!(
                r#"{SELECT_REQUEST_COLUMNS}
                WHERE ($1::TEXT IS NULL OR requests.status = $1)
                  AND ($2::UUID IS NULL OR requests.user_id = $2)
                ORDER BY requests.requested_at DESC, requests.id DESC
                LIMIT $3 OFFSET $4"#
            )
            .as_str(),
        )
        .bind(query.status.map(|status| status.as_str()))
        .bind(query.user_id.map(|user_id| user_id.as_uuid()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list access requests: {error}"))
        })?;

        rows.into_iter().map(AccessRequest::try_from).collect()
    }
}

#[cfg(test)]
mod tests;
