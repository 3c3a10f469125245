use std::sync::Arc;

use sqlx::PgPool;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::entities::content_item::{ContentItem, ContentType};
use crate::domain::entities::scraped_page::{ScrapeOutcome, NO_TITLE_PLACEHOLDER};
use crate::domain::entities::vector_record::VectorRecord;
use crate::domain::services::gemini_ai::{GeminiAiService, GeminiAiServiceError};
use crate::domain::services::page_scraper::PageScraperService;
use crate::helper::error_chain_fmt;
use crate::repositories::content_postgres_repository::{
    ContentPostgresRepository, ContentPostgresRepositoryError,
};
use crate::repositories::vector_record_qdrant_repository::{
    VectorRecordQdrantRepository, VectorRecordQdrantRepositoryError,
};

/// Caller-supplied fields of a content item being added
#[derive(Debug)]
pub struct NewContent {
    pub title: String,
    pub link: Option<String>,
    pub content_type: ContentType,
    pub content: String,
}

/// Orchestrates adding and deleting content across the scraper, the embedder,
/// the primary store and the vector index.
///
/// The scrape-then-embed-then-upsert sequence approximates a transaction
/// without one. The policy is explicit:
/// - scrape failures degrade the data, they never abort ingestion;
/// - the primary record commits before any embedding work, so the user's raw
///   input survives every downstream failure;
/// - embedding/index failures after that commit surface to the caller and
///   leave a dangling primary record, logged with its id for reconciliation;
/// - on delete, a vector-index failure is logged and does not block the
///   primary delete's success (the primary store is the source of truth).
pub struct ContentIngestionService {
    pool: PgPool,
    scraper: Arc<PageScraperService>,
    ai: Arc<GeminiAiService>,
    content_repository: Arc<ContentPostgresRepository>,
    vector_repository: Arc<VectorRecordQdrantRepository>,
}

impl ContentIngestionService {
    pub fn new(
        pool: PgPool,
        scraper: Arc<PageScraperService>,
        ai: Arc<GeminiAiService>,
        content_repository: Arc<ContentPostgresRepository>,
        vector_repository: Arc<VectorRecordQdrantRepository>,
    ) -> Self {
        Self {
            pool,
            scraper,
            ai,
            content_repository,
            vector_repository,
        }
    }

    #[tracing::instrument(
        name = "Adding content",
        skip(self, new_content),
        fields(content_type = %new_content.content_type)
    )]
    pub async fn add_content(
        &self,
        owner_id: Uuid,
        new_content: NewContent,
    ) -> Result<ContentItem, ContentIngestionError> {
        let NewContent {
            title,
            link,
            content_type,
            content,
        } = new_content;

        let scraped = match (&link, content_type.is_url_like()) {
            (Some(link), true) => match Url::parse(link) {
                Ok(url) => Some(self.scraper.scrape(&url).await),
                Err(error) => {
                    warn!(?error, link, "Content link is not a valid URL, skipping scrape");
                    None
                }
            },
            _ => None,
        };

        if let Some(ScrapeOutcome::Degraded(failure)) = &scraped {
            warn!(?failure, "Scrape degraded, ingesting placeholder page data");
        }

        let (title, content, image_url) = merge_scraped_fields(title, content, scraped);

        let item = ContentItem::new(owner_id, title, link, content_type, content, image_url);

        // Committed before any embedding work: a downstream failure must never
        // lose the user's raw input
        self.content_repository
            .add_content(&self.pool, &item)
            .await?;

        let vector = self
            .ai
            .embed(&item.embedding_input())
            .await
            .map_err(|error| {
                error!(
                    ?error,
                    content_id = %item.id,
                    "Embedding failed after the primary record was committed, leaving a dangling record"
                );
                ContentIngestionError::EmbeddingError(error)
            })?;

        self.vector_repository
            .upsert_record(VectorRecord::from_item(&item, vector))
            .await
            .map_err(|error| {
                error!(
                    ?error,
                    content_id = %item.id,
                    "Vector upsert failed after the primary record was committed, leaving a dangling record"
                );
                ContentIngestionError::VectorIndexError(error)
            })?;

        info!(content_id = %item.id, "Content added");
        Ok(item)
    }

    /// Best-effort pair of independent deletes
    #[tracing::instrument(name = "Deleting content", skip(self))]
    pub async fn delete_content(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
    ) -> Result<(), ContentIngestionError> {
        let deleted = self
            .content_repository
            .delete_content(&self.pool, owner_id, content_id)
            .await?;

        // The vector record is only touched when a row this user owns was
        // actually removed; the same id in the index may belong to someone else
        if deleted {
            if let Err(error) = self.vector_repository.delete_record(content_id).await {
                error!(
                    ?error,
                    %content_id,
                    "Vector delete failed after the primary record was removed"
                );
            }
        }

        Ok(())
    }
}

/// Applies the scrape precedence rules to the caller-supplied fields
///
/// Caller-supplied non-empty title and content always win; scraped values only
/// fill empty fields. A degraded scrape fills empty fields with its
/// placeholder text instead. The scraped image is already validated (absolute,
/// non-`blob:`) by the scraper's types.
fn merge_scraped_fields(
    title: String,
    content: String,
    scraped: Option<ScrapeOutcome>,
) -> (String, String, Option<String>) {
    match scraped {
        None => (title, content, None),
        Some(ScrapeOutcome::Scraped(page)) => {
            let title = if title.trim().is_empty() {
                page.title
                    .unwrap_or_else(|| NO_TITLE_PLACEHOLDER.to_string())
            } else {
                title
            };
            let content = if content.trim().is_empty() {
                page.content
            } else {
                content
            };

            (title, content, page.image_url.map(|url| url.to_string()))
        }
        Some(ScrapeOutcome::Degraded(failure)) => {
            let title = if title.trim().is_empty() {
                failure.placeholder_title().to_string()
            } else {
                title
            };
            let content = if content.trim().is_empty() {
                failure.placeholder_content()
            } else {
                content
            };

            (title, content, None)
        }
    }
}

#[derive(thiserror::Error)]
pub enum ContentIngestionError {
    #[error("Error while storing the content item: {0}")]
    ContentRepositoryError(#[from] ContentPostgresRepositoryError),
    #[error("Error while generating the content embedding: {0}")]
    EmbeddingError(GeminiAiServiceError),
    #[error("Error while writing to the vector index: {0}")]
    VectorIndexError(VectorRecordQdrantRepositoryError),
}

impl std::fmt::Debug for ContentIngestionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::scraped_page::{ScrapeFailure, ScrapedPage};

    fn a_scraped_page() -> ScrapeOutcome {
        ScrapeOutcome::Scraped(ScrapedPage {
            title: Some("Scraped title".to_string()),
            content: "Scraped content".to_string(),
            image_url: Some(Url::parse("https://cdn.example.com/cover.png").unwrap()),
        })
    }

    #[test]
    fn empty_caller_fields_take_the_scraped_values() {
        let (title, content, image_url) =
            merge_scraped_fields("".to_string(), "  ".to_string(), Some(a_scraped_page()));

        assert_eq!(title, "Scraped title");
        assert_eq!(content, "Scraped content");
        assert_eq!(image_url.as_deref(), Some("https://cdn.example.com/cover.png"));
    }

    #[test]
    fn a_caller_title_wins_over_the_scraped_title() {
        let (title, content, _) = merge_scraped_fields(
            "My own title".to_string(),
            "".to_string(),
            Some(a_scraped_page()),
        );

        assert_eq!(title, "My own title");
        assert_eq!(content, "Scraped content");
    }

    #[test]
    fn caller_content_is_preserved_when_non_empty() {
        let (_, content, _) = merge_scraped_fields(
            "".to_string(),
            "My own notes".to_string(),
            Some(a_scraped_page()),
        );

        assert_eq!(content, "My own notes");
    }

    #[test]
    fn a_scraped_page_without_title_falls_back_to_the_placeholder() {
        let outcome = ScrapeOutcome::Scraped(ScrapedPage {
            title: None,
            content: "body".to_string(),
            image_url: None,
        });

        let (title, _, _) = merge_scraped_fields("".to_string(), "".to_string(), Some(outcome));

        assert_eq!(title, NO_TITLE_PLACEHOLDER);
    }

    #[test]
    fn a_degraded_scrape_fills_empty_fields_with_its_placeholders() {
        let outcome = ScrapeOutcome::Degraded(ScrapeFailure::NavigationTimeout);

        let (title, content, image_url) =
            merge_scraped_fields("".to_string(), "".to_string(), Some(outcome));

        assert_eq!(title, "Navigation Failed");
        assert!(content.contains("timed out"));
        assert_eq!(image_url, None);
    }

    #[test]
    fn a_degraded_scrape_never_overwrites_caller_fields() {
        let outcome = ScrapeOutcome::Degraded(ScrapeFailure::PageClosed);

        let (title, content, _) = merge_scraped_fields(
            "My title".to_string(),
            "My content".to_string(),
            Some(outcome),
        );

        assert_eq!(title, "My title");
        assert_eq!(content, "My content");
    }

    #[test]
    fn without_a_scrape_the_caller_fields_pass_through() {
        let (title, content, image_url) =
            merge_scraped_fields("T".to_string(), "C".to_string(), None);

        assert_eq!((title.as_str(), content.as_str(), image_url), ("T", "C", None));
    }
}
