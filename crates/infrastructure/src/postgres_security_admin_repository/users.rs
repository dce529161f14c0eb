use medgate_domain::DEFAULT_ROLE_NAME;

use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_users_impl(&self, user_id: Option<UserId>) -> AppResult<Vec<User>> {
        let user_filter = user_id.map(|user_id| user_id.as_uuid());

        let users = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id AS user_id, display_name
            FROM users
            WHERE ($1::UUID IS NULL OR id = $1)
            ORDER BY display_name, id
            "#,
        )
        .bind(user_filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        if users.is_empty() {
            return Ok(Vec::new());
        }

        let assignments = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT user_id, role_id
            FROM user_roles
            WHERE ($1::UUID IS NULL OR user_id = $1)
            "#,
        )
        .bind(user_filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user roles: {error}")))?;

        let roles = self.list_roles_impl(None).await?;

        Ok(users
            .into_iter()
            .map(|row| User {
                user_id: UserId::from_uuid(row.user_id),
                display_name: row.display_name,
                roles: roles
                    .iter()
                    .filter(|role| {
                        assignments.iter().any(|assignment| {
                            assignment.user_id == row.user_id
                                && assignment.role_id == role.role_id.as_uuid()
                        })
                    })
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    pub(super) async fn ensure_user_impl(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> AppResult<UserProvisioning> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let created = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO users (id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name
            RETURNING (xmax = 0) AS created
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(display_name)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to upsert user: {error}")))?;

        if created {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, id
                FROM roles
                WHERE name = $2
                ON CONFLICT (user_id, role_id) DO NOTHING
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(DEFAULT_ROLE_NAME)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to assign default role: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        let user = self.load_user(user_id).await?;
        Ok(if created {
            UserProvisioning::Created(user)
        } else {
            UserProvisioning::Existing(user)
        })
    }

    pub(super) async fn set_user_roles_impl(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<User> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear user roles: {error}")))?;

        for role_id in role_ids {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, role_id) DO NOTHING
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to assign role: {error}")))?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        self.load_user(user_id).await
    }

    async fn load_user(&self, user_id: UserId) -> AppResult<User> {
        self.list_users_impl(Some(user_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
    }
}
