use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::content_item::ContentItem;
use crate::domain::services::gemini_ai::{GeminiAiService, GeminiAiServiceError};
use crate::helper::error_chain_fmt;
use crate::repositories::content_postgres_repository::{
    ContentPostgresRepository, ContentPostgresRepositoryError,
};
use crate::repositories::vector_record_qdrant_repository::{
    ScoredRecordId, VectorRecordQdrantRepository, VectorRecordQdrantRepositoryError,
};

/// How many nearest vectors are fetched from the index. Over-fetches on
/// purpose: some hits may not survive owner-scoped hydration.
const QUERY_TOP_K: u64 = 5;

/// How many hydrated items actually reach the answer prompt. Bounds prompt
/// size and keeps the generated answer grounded in the strongest matches.
const PROMPT_TOP_K: usize = 2;

/// Returned verbatim when the model's response carries no text
const NO_ANSWER_FALLBACK: &str = "No answer could be generated for this query.";

/// Returned when no stored content matches the query
const NO_RELEVANT_CONTENT_ANSWER: &str =
    "No relevant content was found in your second brain for this query.";

/// A hydrated content item together with its similarity score
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedContentItem {
    #[serde(flatten)]
    pub item: ContentItem,
    pub similarity_score: f32,
}

/// Result of a semantic search: a generated answer plus the ranked content it
/// was grounded in
#[derive(Debug)]
pub struct SearchOutcome {
    pub answer: String,
    pub relevant_content: Vec<RankedContentItem>,
}

/// Serves a natural-language query over a user's stored content
///
/// Stateless end-to-end: embed the query, nearest-neighbor search scoped to
/// the owner, hydrate against the primary store (re-scoped to the owner as
/// defense in depth), rank, and generate one answer.
pub struct ContentRetrievalService {
    pool: PgPool,
    ai: Arc<GeminiAiService>,
    content_repository: Arc<ContentPostgresRepository>,
    vector_repository: Arc<VectorRecordQdrantRepository>,
}

impl ContentRetrievalService {
    pub fn new(
        pool: PgPool,
        ai: Arc<GeminiAiService>,
        content_repository: Arc<ContentPostgresRepository>,
        vector_repository: Arc<VectorRecordQdrantRepository>,
    ) -> Self {
        Self {
            pool,
            ai,
            content_repository,
            vector_repository,
        }
    }

    #[tracing::instrument(name = "Searching content", skip(self))]
    pub async fn search(
        &self,
        owner_id: Uuid,
        query: &str,
    ) -> Result<SearchOutcome, ContentRetrievalError> {
        // Validated before any embedding or index round trip
        ensure_valid_query(query)?;

        let query_vector = self
            .ai
            .embed(query)
            .await
            .map_err(ContentRetrievalError::EmbeddingError)?;

        let hits = self
            .vector_repository
            .query_nearest(&query_vector, QUERY_TOP_K, owner_id)
            .await?;

        let ids: Vec<Uuid> = hits.iter().map(|hit| hit.id).collect();

        // Hydration re-scopes to the owner: even if the index filter were
        // bypassed, another user's rows cannot be returned
        let items = if ids.is_empty() {
            Vec::new()
        } else {
            self.content_repository
                .get_contents_by_ids(&self.pool, owner_id, &ids)
                .await?
        };

        let ranked = rank_and_truncate(items, &hits);

        if ranked.is_empty() {
            info!("No relevant content for query, skipping answer generation");
            return Ok(SearchOutcome {
                answer: NO_RELEVANT_CONTENT_ANSWER.to_string(),
                relevant_content: Vec::new(),
            });
        }

        let prompt = build_answer_prompt(query, &ranked);
        let answer = self
            .ai
            .generate_answer(&prompt)
            .await
            .map_err(ContentRetrievalError::GenerationError)?
            .unwrap_or_else(|| NO_ANSWER_FALLBACK.to_string());

        Ok(SearchOutcome {
            answer,
            relevant_content: ranked,
        })
    }
}

fn ensure_valid_query(query: &str) -> Result<(), ContentRetrievalError> {
    if query.trim().is_empty() {
        return Err(ContentRetrievalError::EmptyQuery);
    }
    Ok(())
}

/// Attaches each hydrated item's similarity score, sorts descending, and keeps
/// the strongest matches
///
/// An item without a matching vector hit gets a score of 0 (should not occur,
/// ids come from the hits themselves).
fn rank_and_truncate(items: Vec<ContentItem>, hits: &[ScoredRecordId]) -> Vec<RankedContentItem> {
    let scores: HashMap<Uuid, f32> = hits.iter().map(|hit| (hit.id, hit.score)).collect();

    let mut ranked: Vec<RankedContentItem> = items
        .into_iter()
        .map(|item| {
            let similarity_score = scores.get(&item.id).copied().unwrap_or(0.0);
            RankedContentItem {
                item,
                similarity_score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(PROMPT_TOP_K);

    ranked
}

/// One prompt: a context block enumerating the kept items, then the literal
/// user query. No chunking at this stage.
fn build_answer_prompt(query: &str, ranked: &[RankedContentItem]) -> String {
    let mut context = String::new();
    for ranked_item in ranked {
        let item = &ranked_item.item;
        context.push_str(&format!(
            "Title: {}\nType: {}\nLink: {}\nContent: {}\n\n",
            item.title,
            item.content_type,
            item.link.as_deref().unwrap_or("none"),
            item.content,
        ));
    }

    format!(
        "You are an assistant answering a question using only the user's saved content.\n\n\
         Saved content:\n{}Question: {}",
        context, query
    )
}

#[derive(thiserror::Error)]
pub enum ContentRetrievalError {
    #[error("Search query cannot be empty")]
    EmptyQuery,
    #[error("Error while embedding the search query: {0}")]
    EmbeddingError(GeminiAiServiceError),
    #[error("Error while querying the vector index: {0}")]
    VectorIndexError(#[from] VectorRecordQdrantRepositoryError),
    #[error("Error while hydrating search results: {0}")]
    ContentRepositoryError(#[from] ContentPostgresRepositoryError),
    #[error("Error while generating the answer: {0}")]
    GenerationError(GeminiAiServiceError),
}

impl std::fmt::Debug for ContentRetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::content_item::ContentType;

    fn an_item(owner_id: Uuid, title: &str) -> ContentItem {
        ContentItem::new(
            owner_id,
            title.to_string(),
            None,
            ContentType::Note,
            format!("content of {}", title),
            None,
        )
    }

    #[test]
    fn an_empty_or_whitespace_query_is_rejected() {
        assert!(matches!(
            ensure_valid_query(""),
            Err(ContentRetrievalError::EmptyQuery)
        ));
        assert!(matches!(
            ensure_valid_query("   "),
            Err(ContentRetrievalError::EmptyQuery)
        ));
        assert!(ensure_valid_query("a real query").is_ok());
    }

    #[test]
    fn items_are_sorted_by_score_and_truncated_to_two() {
        let owner_id = Uuid::new_v4();
        let items = vec![
            an_item(owner_id, "low"),
            an_item(owner_id, "high"),
            an_item(owner_id, "mid"),
        ];
        let hits = vec![
            ScoredRecordId {
                id: items[0].id,
                score: 0.1,
            },
            ScoredRecordId {
                id: items[1].id,
                score: 0.9,
            },
            ScoredRecordId {
                id: items[2].id,
                score: 0.5,
            },
        ];

        let ranked = rank_and_truncate(items, &hits);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].item.title, "high");
        assert_eq!(ranked[1].item.title, "mid");
    }

    #[test]
    fn an_item_without_a_hit_gets_a_zero_score_and_ranks_last() {
        let owner_id = Uuid::new_v4();
        let items = vec![an_item(owner_id, "orphan"), an_item(owner_id, "scored")];
        let hits = vec![ScoredRecordId {
            id: items[1].id,
            score: 0.3,
        }];

        let ranked = rank_and_truncate(items, &hits);

        assert_eq!(ranked[0].item.title, "scored");
        assert_eq!(ranked[1].item.title, "orphan");
        assert_eq!(ranked[1].similarity_score, 0.0);
    }

    #[test]
    fn no_items_rank_to_an_empty_list() {
        assert!(rank_and_truncate(Vec::new(), &[]).is_empty());
    }

    #[test]
    fn the_prompt_enumerates_items_and_ends_with_the_literal_query() {
        let owner_id = Uuid::new_v4();
        let item = an_item(owner_id, "My note");
        let ranked = vec![RankedContentItem {
            item,
            similarity_score: 0.8,
        }];

        let prompt = build_answer_prompt("what did I save?", &ranked);

        assert!(prompt.contains("Title: My note"));
        assert!(prompt.contains("Type: note"));
        assert!(prompt.contains("Link: none"));
        assert!(prompt.contains("Content: content of My note"));
        assert!(prompt.ends_with("Question: what did I save?"));
    }
}
