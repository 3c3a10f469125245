use chrono::{DateTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

/// Kind of knowledge a user stores.
///
/// Persisted as lowercase text so new kinds can be added without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[serde(alias = "Note")]
    Note,
    #[serde(alias = "Url")]
    Url,
    #[serde(alias = "Document")]
    Document,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Note => "note",
            ContentType::Url => "url",
            ContentType::Document => "document",
        }
    }

    /// Only URL-like items go through the scraper on ingestion
    pub fn is_url_like(&self) -> bool {
        matches!(self, ContentType::Url)
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "note" => Ok(ContentType::Note),
            "url" => Ok(ContentType::Url),
            "document" => Ok(ContentType::Document),
            _ => Err(format!("Invalid ContentType: {}", s)),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's stored unit of knowledge
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    pub link: Option<String>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub content: String,
    /// Always empty at creation, kept for the client data model
    pub tag: Vec<String>,
    pub owner_id: Uuid,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(
        owner_id: Uuid,
        title: String,
        link: Option<String>,
        content_type: ContentType,
        content: String,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            link,
            content_type,
            content,
            tag: vec![],
            owner_id,
            image_url,
            created_at: Utc::now(),
        }
    }

    /// Human-readable creation time, used in the embedding input and in the
    /// vector record payload
    pub fn human_readable_created_at(&self) -> String {
        self.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }

    /// The string actually embedded for this item: the title and creation time
    /// carry retrieval signal ("that article I saved last week") alongside the body.
    pub fn embedding_input(&self) -> String {
        format!(
            "Title: {}\nAdded: {}\nContent: {}",
            self.title,
            self.human_readable_created_at(),
            self.content
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parses_back_from_its_text_form() {
        for content_type in [ContentType::Note, ContentType::Url, ContentType::Document] {
            assert_eq!(
                content_type.as_str().parse::<ContentType>().unwrap(),
                content_type
            );
        }
    }

    #[test]
    fn content_type_accepts_capitalized_input() {
        assert_eq!("Note".parse::<ContentType>().unwrap(), ContentType::Note);
        assert_eq!("URL".parse::<ContentType>().unwrap(), ContentType::Url);
    }

    #[test]
    fn only_url_items_are_url_like() {
        assert!(ContentType::Url.is_url_like());
        assert!(!ContentType::Note.is_url_like());
        assert!(!ContentType::Document.is_url_like());
    }

    #[test]
    fn embedding_input_carries_title_time_and_content() {
        let item = ContentItem::new(
            Uuid::new_v4(),
            "A title".to_string(),
            None,
            ContentType::Note,
            "Some body".to_string(),
            None,
        );

        let input = item.embedding_input();

        assert!(input.starts_with("Title: A title\nAdded: "));
        assert!(input.ends_with("\nContent: Some body"));
        assert!(input.contains(&item.human_readable_created_at()));
    }

    #[test]
    fn new_items_carry_no_tags() {
        let item = ContentItem::new(
            Uuid::new_v4(),
            "t".to_string(),
            None,
            ContentType::Note,
            "c".to_string(),
            None,
        );

        assert!(item.tag.is_empty());
    }
}
