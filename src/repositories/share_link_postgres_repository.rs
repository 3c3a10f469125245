use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::entities::share_link::ShareLink;
use crate::helper::error_chain_fmt;

/// Share link repository implemented using Postgres
///
/// A user has at most one share link (unique constraint on `user_id`), so
/// enabling sharing is idempotent at the repository level.
pub struct ShareLinkPostgresRepository {}

impl Default for ShareLinkPostgresRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ShareLinkPostgresRepository {
    pub fn new() -> Self {
        Self {}
    }

    #[tracing::instrument(name = "Fetching share link for user", skip(self, db_executor))]
    pub async fn get_for_user(
        &self,
        db_executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<ShareLink>, ShareLinkPostgresRepositoryError> {
        let record: Option<(String, Uuid, DateTime<Utc>)> = sqlx::query_as(
            r#"
    SELECT hash, user_id, created_at FROM share_links
    WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db_executor)
        .await?;

        Ok(record.map(|(hash, user_id, created_at)| ShareLink {
            hash,
            user_id,
            created_at,
        }))
    }

    #[tracing::instrument(name = "Saving new share link", skip(self, db_executor, share_link))]
    pub async fn add_share_link(
        &self,
        db_executor: impl PgExecutor<'_>,
        share_link: &ShareLink,
    ) -> Result<(), ShareLinkPostgresRepositoryError> {
        sqlx::query(
            r#"
    INSERT INTO share_links (hash, user_id, created_at)
    VALUES ($1, $2, $3)
            "#,
        )
        .bind(&share_link.hash)
        .bind(share_link.user_id)
        .bind(share_link.created_at)
        .execute(db_executor)
        .await?;

        Ok(())
    }

    /// Disables sharing; tolerant of sharing not being enabled
    #[tracing::instrument(name = "Deleting share link for user", skip(self, db_executor))]
    pub async fn delete_for_user(
        &self,
        db_executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<(), ShareLinkPostgresRepositoryError> {
        sqlx::query(
            r#"
    DELETE FROM share_links
    WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(db_executor)
        .await?;

        Ok(())
    }

    /// Resolves an opaque hash to the sharing user's id
    #[tracing::instrument(name = "Resolving share hash", skip(self, db_executor))]
    pub async fn resolve_hash(
        &self,
        db_executor: impl PgExecutor<'_>,
        hash: &str,
    ) -> Result<Option<Uuid>, ShareLinkPostgresRepositoryError> {
        let record: Option<(Uuid,)> = sqlx::query_as(
            r#"
    SELECT user_id FROM share_links
    WHERE hash = $1
            "#,
        )
        .bind(hash)
        .fetch_optional(db_executor)
        .await?;

        Ok(record.map(|(user_id,)| user_id))
    }
}

#[derive(thiserror::Error)]
pub enum ShareLinkPostgresRepositoryError {
    #[error(transparent)]
    DBError(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for ShareLinkPostgresRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
