use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::entities::content_item::ContentItem;
use crate::helper::error_chain_fmt;

/// Content item repository implemented using Postgres
///
/// The primary store: the source of truth for what a user owns. Every query
/// here is scoped by owner id.
pub struct ContentPostgresRepository {}

impl Default for ContentPostgresRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(sqlx::FromRow)]
struct ContentItemRow {
    id: Uuid,
    title: String,
    link: Option<String>,
    content_type: String,
    content: String,
    tag: Vec<String>,
    owner_id: Uuid,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ContentItemRow> for ContentItem {
    type Error = anyhow::Error;

    fn try_from(row: ContentItemRow) -> Result<Self, Self::Error> {
        let content_type = row
            .content_type
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Failed to parse the stored content type")?;

        Ok(ContentItem {
            id: row.id,
            title: row.title,
            link: row.link,
            content_type,
            content: row.content,
            tag: row.tag,
            owner_id: row.owner_id,
            image_url: row.image_url,
            created_at: row.created_at,
        })
    }
}

impl ContentPostgresRepository {
    pub fn new() -> Self {
        Self {}
    }

    #[tracing::instrument(
        name = "Saving new content item in database",
        skip(self, db_executor, item),
        fields(content_id = %item.id)
    )]
    pub async fn add_content(
        &self,
        db_executor: impl PgExecutor<'_>,
        item: &ContentItem,
    ) -> Result<(), ContentPostgresRepositoryError> {
        sqlx::query(
            r#"
    INSERT INTO content_items (id, title, link, content_type, content, tag, owner_id, image_url, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(&item.link)
        .bind(item.content_type.as_str())
        .bind(&item.content)
        .bind(&item.tag)
        .bind(item.owner_id)
        .bind(&item.image_url)
        .bind(item.created_at)
        .execute(db_executor)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Listing content items for owner", skip(self, db_executor))]
    pub async fn get_contents_for_owner(
        &self,
        db_executor: impl PgExecutor<'_>,
        owner_id: Uuid,
    ) -> Result<Vec<ContentItem>, ContentPostgresRepositoryError> {
        let rows: Vec<ContentItemRow> = sqlx::query_as(
            r#"
    SELECT id, title, link, content_type, content, tag, owner_id, image_url, created_at
    FROM content_items
    WHERE owner_id = $1
    ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(db_executor)
        .await?;

        rows.into_iter()
            .map(|row| row.try_into().map_err(ContentPostgresRepositoryError::Other))
            .collect()
    }

    /// Fetches the given ids, restricted to the owner
    ///
    /// Ids that do not exist or belong to another user are silently absent
    /// from the result.
    #[tracing::instrument(name = "Fetching content items by ids", skip(self, db_executor, ids))]
    pub async fn get_contents_by_ids(
        &self,
        db_executor: impl PgExecutor<'_>,
        owner_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<ContentItem>, ContentPostgresRepositoryError> {
        let rows: Vec<ContentItemRow> = sqlx::query_as(
            r#"
    SELECT id, title, link, content_type, content, tag, owner_id, image_url, created_at
    FROM content_items
    WHERE owner_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(owner_id)
        .bind(ids.to_vec())
        .fetch_all(db_executor)
        .await?;

        rows.into_iter()
            .map(|row| row.try_into().map_err(ContentPostgresRepositoryError::Other))
            .collect()
    }

    /// Deletes one content item owned by `owner_id`
    ///
    /// # Returns
    /// `true` when a row was actually removed. A non-existing id and an id
    /// owned by someone else both return `false`.
    #[tracing::instrument(name = "Deleting content item", skip(self, db_executor))]
    pub async fn delete_content(
        &self,
        db_executor: impl PgExecutor<'_>,
        owner_id: Uuid,
        content_id: Uuid,
    ) -> Result<bool, ContentPostgresRepositoryError> {
        let result = sqlx::query(
            r#"
    DELETE FROM content_items
    WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(content_id)
        .bind(owner_id)
        .execute(db_executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(thiserror::Error)]
pub enum ContentPostgresRepositoryError {
    #[error(transparent)]
    DBError(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for ContentPostgresRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
