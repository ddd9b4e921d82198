//! Handle database requests.

use sqlx::PgPool;

use crate::error::{Result, ServerError};
use crate::user::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an account using `email` field, compared as stored.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, avatar, password_hash, created_at
                FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Insert a new account and return it with its store-assigned `id`.
    ///
    /// The unique index on `email` is the authoritative duplicate check:
    /// a violation is reported as the duplicate-account conflict, whatever
    /// the earlier lookup saw.
    pub async fn insert(
        &self,
        name: &str,
        email: &str,
        avatar: &str,
        password_hash: &str,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (name, email, avatar, password_hash)
                VALUES ($1, $2, $3, $4)
                RETURNING id, name, email, avatar, password_hash, created_at"#,
        )
        .bind(name)
        .bind(email)
        .bind(avatar)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ServerError::Conflict
            },
            err => err.into(),
        })
    }
}
