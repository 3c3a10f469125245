use secrecy::Secret;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::entities::user::{CheckingUser, CreatingUser};
use crate::helper::error_chain_fmt;

/// Postgres unique-violation error code
const UNIQUE_VIOLATION_CODE: &str = "23505";

/// User repository implemented using Postgres
pub struct UserPostgresRepository {}

impl Default for UserPostgresRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl UserPostgresRepository {
    pub fn new() -> Self {
        Self {}
    }

    #[tracing::instrument(name = "Saving new user in database", skip(self, db_executor, user))]
    pub async fn add_user(
        &self,
        db_executor: impl PgExecutor<'_>,
        user: &CreatingUser,
    ) -> Result<(), UserPostgresRepositoryError> {
        sqlx::query(
            r#"
    INSERT INTO users (id, username, password_hash, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(user.username.as_ref())
        .bind(user.password_hash.as_ref())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(db_executor)
        .await
        .map_err(|error| {
            let is_unique_violation = error
                .as_database_error()
                .and_then(|db_error| db_error.code())
                .map(|code| code == UNIQUE_VIOLATION_CODE)
                .unwrap_or(false);

            if is_unique_violation {
                UserPostgresRepositoryError::UsernameTaken(user.username.to_string())
            } else {
                error.into()
            }
        })?;

        Ok(())
    }

    #[tracing::instrument(name = "Checking user in database", skip(self, db_executor))]
    pub async fn check_user(
        &self,
        db_executor: impl PgExecutor<'_>,
        username: &str,
    ) -> Result<CheckingUser, UserPostgresRepositoryError> {
        let record: (Uuid, String) = sqlx::query_as(
            r#"
    SELECT id, password_hash FROM users
    WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_one(db_executor)
        .await
        .map_err(|_| UserPostgresRepositoryError::UserDoesNotExist(username.to_string()))?;

        Ok(CheckingUser {
            id: record.0,
            password_hash: Secret::new(record.1),
        })
    }

    /// Username for a known user id, used on shared brain pages
    #[tracing::instrument(name = "Fetching username", skip(self, db_executor))]
    pub async fn get_username(
        &self,
        db_executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<String, UserPostgresRepositoryError> {
        let record: (String,) = sqlx::query_as(
            r#"
    SELECT username FROM users
    WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(db_executor)
        .await
        .map_err(|_| UserPostgresRepositoryError::UserDoesNotExist(user_id.to_string()))?;

        Ok(record.0)
    }
}

#[derive(thiserror::Error)]
pub enum UserPostgresRepositoryError {
    #[error(transparent)]
    DBError(#[from] sqlx::Error),
    #[error("{0}")]
    UserDoesNotExist(String),
    #[error("Username {0} is already taken")]
    UsernameTaken(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for UserPostgresRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
