use sqlx::{Postgres, Transaction};

use crate::map_unique_violation;

use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_roles_impl(&self, role_id: Option<RoleId>) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                roles.id AS role_id,
                roles.name AS role_name,
                roles.is_protected,
                permissions.name AS permission_name
            FROM roles
            LEFT JOIN role_permissions
                ON role_permissions.role_id = roles.id
            LEFT JOIN permissions
                ON permissions.id = role_permissions.permission_id
            WHERE ($1::UUID IS NULL OR roles.id = $1)
            ORDER BY roles.name, roles.id, permissions.name
            "#,
        )
        .bind(role_id.map(|role_id| role_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        aggregate_roles(rows)
    }

    pub(super) async fn create_role_impl(&self, input: SaveRoleInput) -> AppResult<Role> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let role_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO roles (name, is_protected)
            VALUES ($1, false)
            RETURNING id
            "#,
        )
        .bind(input.name.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                || format!("role '{}' already exists", input.name),
                "create role",
            )
        })?;
        let role_id = RoleId::from_uuid(role_id);

        replace_role_permissions(&mut transaction, role_id, &input.permission_ids).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        self.load_role(role_id).await
    }

    pub(super) async fn update_role_impl(
        &self,
        role_id: RoleId,
        input: SaveRoleInput,
    ) -> AppResult<Role> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(input.name.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                || format!("role '{}' already exists", input.name),
                "update role",
            )
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        replace_role_permissions(&mut transaction, role_id, &input.permission_ids).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        self.load_role(role_id).await
    }

    pub(super) async fn delete_role_impl(&self, role_id: RoleId) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM roles
            WHERE id = $1 AND is_protected = false
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "unprotected role '{role_id}' does not exist"
            )));
        }

        Ok(())
    }

    async fn load_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.list_roles_impl(Some(role_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal(format!("role '{role_id}' vanished after write")))
    }
}

async fn replace_role_permissions(
    transaction: &mut Transaction<'_, Postgres>,
    role_id: RoleId,
    permission_ids: &[PermissionId],
) -> AppResult<()> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id.as_uuid())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear role permissions: {error}"))
        })?;

    for permission_id in permission_ids {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist role permissions: {error}"))
        })?;
    }

    Ok(())
}
