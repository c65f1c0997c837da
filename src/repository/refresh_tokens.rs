use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::models::RefreshToken;

const TOKEN_COLUMNS: &str = "id, token, user_id, expires_at, revoked, created_at";

pub async fn create<'e, E>(
    executor: E,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<RefreshToken, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, RefreshToken>(&format!(
        "INSERT INTO refresh_tokens (token, user_id, expires_at, revoked, created_at) \
         VALUES ($1, $2, $3, FALSE, $4) RETURNING {}",
        TOKEN_COLUMNS
    ))
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
}

/// Looks up an unrevoked token by its exact value. Expiry is not checked here.
#[cfg(test)]
pub async fn find_active<'e, E>(executor: E, token: &str) -> Result<Option<RefreshToken>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, RefreshToken>(&format!(
        "SELECT {} FROM refresh_tokens WHERE token = $1 AND revoked = FALSE AND deleted_at IS NULL",
        TOKEN_COLUMNS
    ))
    .bind(token)
    .fetch_optional(executor)
    .await
}

/// Looks up a token by value regardless of its revocation state.
#[cfg(test)]
pub async fn find_by_token<'e, E>(executor: E, token: &str) -> Result<Option<RefreshToken>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, RefreshToken>(&format!(
        "SELECT {} FROM refresh_tokens WHERE token = $1 AND deleted_at IS NULL",
        TOKEN_COLUMNS
    ))
    .bind(token)
    .fetch_optional(executor)
    .await
}

/// Revokes an unrevoked token by value and returns the row as it was claimed.
///
/// Expiry is not checked here. At most one caller gets `Some` for a given
/// token. Inside a transaction this must be the first statement, so the
/// write lock is taken before anything is read.
pub async fn claim_active<'e, E>(executor: E, token: &str) -> Result<Option<RefreshToken>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, RefreshToken>(&format!(
        "UPDATE refresh_tokens SET revoked = TRUE \
         WHERE token = $1 AND revoked = FALSE AND deleted_at IS NULL RETURNING {}",
        TOKEN_COLUMNS
    ))
    .bind(token)
    .fetch_optional(executor)
    .await
}

/// Revokes every live token of a user, returning how many changed.
pub async fn revoke_all_for_user<'e, E>(executor: E, user_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE AND deleted_at IS NULL",
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Soft-deletes tokens whose expiry lies before `now`.
pub async fn soft_delete_expired<'e, E>(executor: E, now: DateTime<Utc>) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE refresh_tokens SET deleted_at = $1 WHERE expires_at < $1 AND deleted_at IS NULL",
    )
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
