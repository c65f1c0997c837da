use chrono::Utc;
use sqlx::{Executor, Sqlite};

use crate::models::User;

const USER_COLUMNS: &str = "id, email, password_hash, name, created_at";

/// Inserts a user and returns the stored row.
///
/// Fails with a unique violation when the email is already registered.
pub async fn create<'e, E>(
    executor: E,
    email: &str,
    password_hash: &str,
    name: &str,
) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, password_hash, name, created_at) VALUES ($1, $2, $3, $4) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
}

pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1 AND deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn exists_by_email<'e, E>(executor: E, email: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(executor)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[actix_rt::test]
    async fn test_create_and_find_user() {
        let pool = db::connect_in_memory().await.unwrap();
        db::migrate(&pool).await.unwrap();

        let created = create(&pool, "ada@example.com", "hash", "Ada").await.unwrap();
        assert!(created.id > 0);

        let by_email = find_by_email(&pool, "ada@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.password_hash, "hash");

        let by_id = find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ada@example.com");

        assert!(exists_by_email(&pool, "ada@example.com").await.unwrap());
        assert!(!exists_by_email(&pool, "bob@example.com").await.unwrap());
        assert!(find_by_id(&pool, created.id + 1).await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_duplicate_email_is_unique_violation() {
        let pool = db::connect_in_memory().await.unwrap();
        db::migrate(&pool).await.unwrap();

        create(&pool, "ada@example.com", "hash", "Ada").await.unwrap();
        let err = create(&pool, "ada@example.com", "other", "Ada Again")
            .await
            .unwrap_err();

        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("expected a database error, got {:?}", other),
        }
    }
}
