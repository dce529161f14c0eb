use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use medgate_application::{AccessCodeQuery, AccessCodeRepository};
use medgate_core::{AppError, AppResult, UserId};
use medgate_domain::{AccessCodeId, PermissionId, PermissionName, TemporaryAccessCode};

use crate::map_unique_violation;

/// PostgreSQL-backed repository for temporary access codes.
#[derive(Clone)]
pub struct PostgresAccessCodeRepository {
    pool: PgPool,
}

impl PostgresAccessCodeRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AccessCodeRow {
    id: uuid::Uuid,
    code_hash: String,
    code_hint: String,
    permission_id: uuid::Uuid,
    permission_name: String,
    user_id: uuid::Uuid,
    expires_at: DateTime<Utc>,
    is_single_use: bool,
    times_used: i32,
    is_active: bool,
    created_by: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccessCodeRow> for TemporaryAccessCode {
    type Error = AppError;

    fn try_from(row: AccessCodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            code_id: AccessCodeId::from_uuid(row.id),
            code_hash: row.code_hash,
            code_hint: row.code_hint,
            permission_id: PermissionId::from_uuid(row.permission_id),
            permission_name: PermissionName::new(row.permission_name.as_str()).map_err(
                |error| {
                    AppError::Internal(format!(
                        "invalid stored permission '{}': {error}",
                        row.permission_name
                    ))
                },
            )?,
            user_id: UserId::from_uuid(row.user_id),
            expires_at: row.expires_at,
            is_single_use: row.is_single_use,
            times_used: u32::try_from(row.times_used).map_err(|_| {
                AppError::Internal(format!(
                    "temporary access code '{}' has negative usage count",
                    row.id
                ))
            })?,
            is_active: row.is_active,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
        })
    }
}

const SELECT_CODE_COLUMNS: &str = r#"
    SELECT
        codes.id,
        codes.code_hash,
        codes.code_hint,
        codes.permission_id,
        permissions.name AS permission_name,
        codes.user_id,
        codes.expires_at,
        codes.is_single_use,
        codes.times_used,
        codes.is_active,
        codes.created_by,
        codes.created_at
    FROM temporary_access_codes codes
    INNER JOIN permissions ON permissions.id = codes.permission_id
"#;

#[async_trait]
impl AccessCodeRepository for PostgresAccessCodeRepository {
    async fn insert_code(&self, code: TemporaryAccessCode) -> AppResult<()> {
        let times_used = i32::try_from(code.times_used).map_err(|_| {
            AppError::Validation("temporary access code usage count is too large".to_owned())
        })?;

        sqlx::query(
            r#"
            INSERT INTO temporary_access_codes (
                id,
                code_hash,
                code_hint,
                permission_id,
                user_id,
                expires_at,
                is_single_use,
                times_used,
                is_active,
                created_by,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(code.code_id.as_uuid())
        .bind(code.code_hash.as_str())
        .bind(code.code_hint.as_str())
        .bind(code.permission_id.as_uuid())
        .bind(code.user_id.as_uuid())
        .bind(code.expires_at)
        .bind(code.is_single_use)
        .bind(times_used)
        .bind(code.is_active)
        .bind(code.created_by.map(|user_id| user_id.as_uuid()))
        .bind(code.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                || "temporary access code hash collision".to_owned(),
                "insert temporary access code",
            )
        })?;

        Ok(())
    }

    async fn activate_code(
        &self,
        code_hash: &str,
        requesting_user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<TemporaryAccessCode> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let row = sqlx::query_as::<_, AccessCodeRow>(
            format!("{SELECT_CODE_COLUMNS} WHERE codes.code_hash = $1 FOR UPDATE OF codes")
                .as_str(),
        )
        .bind(code_hash)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load temporary access code: {error}"))
        })?
        .ok_or_else(|| AppError::NotFound("temporary access code not found".to_owned()))?;

        let mut code = TemporaryAccessCode::try_from(row)?;
        code.activate(requesting_user, now)?;

        let times_used = i32::try_from(code.times_used).map_err(|_| {
            AppError::Internal("temporary access code usage count overflowed".to_owned())
        })?;

        sqlx::query(
            r#"
            UPDATE temporary_access_codes
            SET times_used = $2, is_active = $3
            WHERE id = $1
            "#,
        )
        .bind(code.code_id.as_uuid())
        .bind(times_used)
        .bind(code.is_active)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to record code activation: {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(code)
    }

    async fn revoke_code(&self, code_id: AccessCodeId) -> AppResult<TemporaryAccessCode> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE temporary_access_codes
            SET is_active = false
            WHERE id = $1
            "#,
        )
        .bind(code_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to revoke temporary access code: {error}"))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "temporary access code '{code_id}' does not exist"
            )));
        }

        let row = sqlx::query_as::<_, AccessCodeRow>(
            format!("{SELECT_CODE_COLUMNS} WHERE codes.id = $1").as_str(),
        )
        .bind(code_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load temporary access code: {error}"))
        })?;

        TemporaryAccessCode::try_from(row)
    }

    async fn delete_code(&self, code_id: AccessCodeId) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM temporary_access_codes
            WHERE id = $1
            "#,
        )
        .bind(code_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete temporary access code: {error}"))
        })?;

        Ok(())
    }

    async fn list_codes(&self, query: AccessCodeQuery) -> AppResult<Vec<TemporaryAccessCode>> {
        let limit = i64::try_from(query.limit.clamp(1, 200)).map_err(|error| {
            AppError::Validation(format!("invalid temporary access code limit: {error}"))
        })?;
        let offset = i64::try_from(query.offset).map_err(|error| {
            AppError::Validation(format!("invalid temporary access code offset: {error}"))
        })?;

        let rows = sqlx::query_as::<_, AccessCodeRow>(
            format!(
                r#"{SELECT_CODE_COLUMNS}
                WHERE ($1::UUID IS NULL OR codes.user_id = $1)
                  AND (
                    $2::TIMESTAMPTZ IS NULL
                    OR (
                        codes.is_active
                        AND codes.expires_at > $2
                        AND NOT (codes.is_single_use AND codes.times_used > 0)
                    )
                  )
                ORDER BY codes.created_at DESC, codes.id DESC
                LIMIT $3 OFFSET $4"#
            )
            .as_str(),
        )
        .bind(query.user_id.map(|user_id| user_id.as_uuid()))
        .bind(query.usable_at)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list temporary access codes: {error}"))
        })?;

        rows.into_iter().map(TemporaryAccessCode::try_from).collect()
    }
}
