use sqlx::PgPool;

use crate::errors::AppError;

/// A user who can log in. `permissions` is a comma-separated list of
/// permission codes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub password_hash: String,
    pub permissions: String,
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT user_id, username, password_hash, permissions FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Insert the user, or refresh password and permissions when it already exists.
pub async fn upsert(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    permissions: &str,
) -> Result<i64, AppError> {
    let (user_id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (username, password_hash, permissions) VALUES ($1, $2, $3) \
         ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash, \
                                              permissions = EXCLUDED.permissions \
         RETURNING user_id",
    )
    .bind(username)
    .bind(password_hash)
    .bind(permissions)
    .fetch_one(pool)
    .await?;
    Ok(user_id)
}
