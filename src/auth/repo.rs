use crate::auth::repo_types::User;
use sqlx::SqlitePool;
use time::OffsetDateTime;

impl User {
    /// Find a user by exact username.
    pub async fn find_by_username(db: &SqlitePool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT username, namespace, password_hash, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_all(db)
        .await?;
        Ok(user.into_iter().next())
    }

    /// Whether the username or its pantry namespace is already registered.
    pub async fn is_taken(db: &SqlitePool, username: &str, namespace: &str) -> anyhow::Result<bool> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1
            FROM users
            WHERE username = ? OR namespace = ?
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(namespace)
        .fetch_all(db)
        .await?;
        Ok(!rows.is_empty())
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        namespace: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, namespace, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING username, namespace, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(namespace)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_all(db)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)
    }
}
