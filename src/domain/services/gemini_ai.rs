use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::json;

use crate::configuration::GenerativeAiSettings;
use crate::domain::entities::vector_record::Embeddings;
use crate::helper::error_chain_fmt;

/// Adapter over the Gemini REST API: text embeddings, chunked summarization
/// and single-shot answer generation.
///
/// Built once at startup; the inner HTTP client is shared by all requests.
pub struct GeminiAiService {
    client: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
    embedding_model: String,
    generation_model: String,
    summary_chunk_size: usize,
}

impl GeminiAiService {
    pub fn try_new(settings: &GenerativeAiSettings) -> Result<Self, GeminiAiServiceError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            embedding_model: settings.embedding_model.clone(),
            generation_model: settings.generation_model.clone(),
            summary_chunk_size: settings.summary_chunk_size,
        })
    }

    /// Turns a text into its fixed-length vector representation
    #[tracing::instrument(name = "Generating embedding", skip(self, text))]
    pub async fn embed(&self, text: &str) -> Result<Embeddings, GeminiAiServiceError> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.base_url, self.embedding_model
        );
        let body = json!({ "content": { "parts": [{ "text": text }] } });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiAiServiceError::ApiError { status, body });
        }

        let payload: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiAiServiceError::EmbeddingFormatError(e.to_string()))?;

        payload
            .embedding
            .map(EmbeddingShape::into_values)
            .ok_or_else(|| {
                GeminiAiServiceError::EmbeddingFormatError(
                    "the response carried no embedding field".to_string(),
                )
            })
    }

    /// Summarizes a long text by fixed-size character chunks
    ///
    /// Each chunk is summarized independently; summaries are concatenated in
    /// order, newline-separated. Used to preprocess long documents before
    /// embedding, not on the hot ingestion path.
    #[tracing::instrument(name = "Summarizing text in chunks", skip(self, text))]
    pub async fn summarize_in_chunks(&self, text: &str) -> Result<String, GeminiAiServiceError> {
        let chunks = split_into_char_chunks(text, self.summary_chunk_size);
        let mut summaries = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let prompt = format!("Summarize the following text concisely:\n\n{}", chunk);
            let summary = self.generate_content(&prompt).await?.unwrap_or_default();
            summaries.push(summary);
        }

        Ok(summaries.join("\n"))
    }

    /// Single-shot prompt completion
    ///
    /// Returns `None` when the model's response carries no text, the caller
    /// decides on a fallback.
    #[tracing::instrument(name = "Generating answer", skip(self, prompt))]
    pub async fn generate_answer(
        &self,
        prompt: &str,
    ) -> Result<Option<String>, GeminiAiServiceError> {
        self.generate_content(prompt).await
    }

    async fn generate_content(
        &self,
        prompt: &str,
    ) -> Result<Option<String>, GeminiAiServiceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.generation_model
        );
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiAiServiceError::ApiError { status, body });
        }

        let payload: GenerateContentResponse = response.json().await?;

        Ok(payload.first_text())
    }
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<EmbeddingShape>,
}

/// The provider's embedding has been observed both as a nested
/// `{"values": [...]}` object and as a flat array. Both shapes are decoded
/// here, once, at the adapter boundary; downstream code only ever sees one
/// canonical `Vec<f32>`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingShape {
    Nested { values: Embeddings },
    Flat(Embeddings),
}

impl EmbeddingShape {
    fn into_values(self) -> Embeddings {
        match self {
            EmbeddingShape::Nested { values } => values,
            EmbeddingShape::Flat(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<GenerateContentCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentCandidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate's first part, if any
    fn first_text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()?
            .content?
            .parts?
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.is_empty())
    }
}

/// Splits a text into chunks of at most `chunk_size` characters, preserving order
///
/// Character-based and not byte-based so multi-byte text never splits a code point.
fn split_into_char_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();

    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[derive(thiserror::Error)]
pub enum GeminiAiServiceError {
    #[error("Error while calling the generative AI API: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Generative AI API returned status {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("Embedding response did not contain a numeric vector: {0}")]
    EmbeddingFormatError(String),
}

impl std::fmt::Debug for GeminiAiServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_none, assert_some};

    #[test]
    fn a_nested_embedding_shape_is_normalized() {
        let payload: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding": {"values": [0.1, 0.2, 0.3]}}"#).unwrap();

        let values = payload.embedding.unwrap().into_values();

        assert_eq!(values, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn a_flat_embedding_shape_is_normalized() {
        let payload: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding": [0.1, 0.2, 0.3]}"#).unwrap();

        let values = payload.embedding.unwrap().into_values();

        assert_eq!(values, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn a_response_without_embedding_yields_none() {
        let payload: EmbedContentResponse = serde_json::from_str(r#"{}"#).unwrap();

        assert!(payload.embedding.is_none());
    }

    #[test]
    fn a_non_numeric_embedding_shape_is_rejected() {
        let payload: Result<EmbedContentResponse, _> =
            serde_json::from_str(r#"{"embedding": {"values": "not-a-vector"}}"#);

        assert!(payload.is_err());
    }

    #[test]
    fn the_first_candidate_text_is_extracted() {
        let payload: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [
                {"content": {"parts": [{"text": "first"}, {"text": "second"}]}},
                {"content": {"parts": [{"text": "other candidate"}]}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(payload.first_text().as_deref(), Some("first"));
    }

    #[test]
    fn a_response_without_candidates_or_text_yields_none() {
        let payload: GenerateContentResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_none!(payload.first_text());

        let payload: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": [{"text": ""}]}}]}"#)
                .unwrap();
        assert_none!(payload.first_text());

        let payload: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": []}}]}"#).unwrap();
        assert_none!(payload.first_text());
    }

    #[test]
    fn some_text_is_reported() {
        let payload: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": [{"text": "hi"}]}}]}"#)
                .unwrap();

        assert_some!(payload.first_text());
    }

    #[test]
    fn chunking_splits_at_the_character_budget_in_order() {
        let chunks = split_into_char_chunks("abcdefgh", 3);

        assert_eq!(chunks, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn chunking_never_splits_a_code_point() {
        let chunks = split_into_char_chunks(&"é".repeat(5), 2);

        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn an_empty_text_yields_no_chunks() {
        assert!(split_into_char_chunks("", 2000).is_empty());
    }
}
