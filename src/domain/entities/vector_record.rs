use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content_item::ContentItem;

pub type Embeddings = Vec<f32>;

/// Number of characters of content carried in the vector record payload,
/// enough for a result preview without duplicating the whole body in the index
const SNIPPET_CHARS: usize = 100;

/// The embedding-index twin of a `ContentItem`
///
/// Shares the content item's id so the two stores can be kept in sync
/// (and reconciled when a partial failure leaves one side dangling).
#[derive(Debug, Deserialize, Serialize)]
pub struct VectorRecord {
    pub id: Uuid,
    pub vector: Embeddings,
    pub payload: VectorRecordPayload,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VectorRecordPayload {
    pub owner_id: Uuid,
    pub title: String,
    pub content_type: String,
    /// Human-readable creation time
    pub timestamp: String,
    /// First characters of the content
    pub snippet: String,
    /// Empty string when the item has no image
    pub image_url: String,
}

impl VectorRecord {
    pub fn from_item(item: &ContentItem, vector: Embeddings) -> Self {
        Self {
            id: item.id,
            vector,
            payload: VectorRecordPayload {
                owner_id: item.owner_id,
                title: item.title.clone(),
                content_type: item.content_type.to_string(),
                timestamp: item.human_readable_created_at(),
                // `chars` and not a byte slice: the cut must not split a code point
                snippet: item.content.chars().take(SNIPPET_CHARS).collect(),
                image_url: item.image_url.clone().unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::content_item::ContentType;

    fn an_item(content: &str, image_url: Option<&str>) -> ContentItem {
        ContentItem::new(
            Uuid::new_v4(),
            "A title".to_string(),
            Some("https://example.com".to_string()),
            ContentType::Url,
            content.to_string(),
            image_url.map(String::from),
        )
    }

    #[test]
    fn record_shares_the_item_id() {
        let item = an_item("body", None);
        let record = VectorRecord::from_item(&item, vec![0.1, 0.2]);

        assert_eq!(record.id, item.id);
        assert_eq!(record.payload.owner_id, item.owner_id);
    }

    #[test]
    fn snippet_is_capped_at_100_characters() {
        let long_content = "x".repeat(500);
        let record = VectorRecord::from_item(&an_item(&long_content, None), vec![]);

        assert_eq!(record.payload.snippet.chars().count(), 100);
    }

    #[test]
    fn snippet_cap_respects_multibyte_characters() {
        let long_content = "é".repeat(500);
        let record = VectorRecord::from_item(&an_item(&long_content, None), vec![]);

        assert_eq!(record.payload.snippet.chars().count(), 100);
        assert_eq!(record.payload.snippet, "é".repeat(100));
    }

    #[test]
    fn short_content_is_kept_whole() {
        let record = VectorRecord::from_item(&an_item("short", None), vec![]);

        assert_eq!(record.payload.snippet, "short");
    }

    #[test]
    fn missing_image_becomes_an_empty_string_sentinel() {
        let record = VectorRecord::from_item(&an_item("c", None), vec![]);
        assert_eq!(record.payload.image_url, "");

        let record =
            VectorRecord::from_item(&an_item("c", Some("https://example.com/img.png")), vec![]);
        assert_eq!(record.payload.image_url, "https://example.com/img.png");
    }
}
