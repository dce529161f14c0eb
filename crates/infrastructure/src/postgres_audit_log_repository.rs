use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use medgate_application::{AuditLogEntry, AuditLogQuery, AuditLogRepository};
use medgate_core::{AppError, AppResult};

/// PostgreSQL-backed repository for audit log read models.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    event_id: uuid::Uuid,
    actor_user_id: Option<uuid::Uuid>,
    actor_display_name: Option<String>,
    action: String,
    resource_type: String,
    resource_id: String,
    detail: Option<String>,
    created_at: String,
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let capped_limit = query.limit.clamp(1, 200) as i64;
        let capped_offset = query.offset.min(10_000) as i64;
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                entries.id AS event_id,
                entries.actor_user_id,
                users.display_name AS actor_display_name,
                entries.action,
                entries.resource_type,
                entries.resource_id,
                entries.detail,
                to_char(entries.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            FROM audit_log_entries AS entries
            LEFT JOIN users
                ON users.id = entries.actor_user_id
            WHERE ($1::TEXT IS NULL OR entries.action = $1)
                AND ($2::UUID IS NULL OR entries.actor_user_id = $2)
            ORDER BY entries.created_at DESC, entries.id DESC
            LIMIT $3
            OFFSET $4
            "#,
        )
        .bind(query.action)
        .bind(query.actor.map(|actor| actor.as_uuid()))
        .bind(capped_limit)
        .bind(capped_offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list audit log entries: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| AuditLogEntry {
                event_id: row.event_id.to_string(),
                actor_user_id: row.actor_user_id.map(|actor| actor.to_string()),
                actor_display_name: row.actor_display_name,
                action: row.action,
                resource_type: row.resource_type,
                resource_id: row.resource_id,
                detail: row.detail,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests;
