use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use tracing::info;

use crate::domain::services::content_retrieval::{ContentRetrievalError, ContentRetrievalService};
use crate::helper::error_chain_fmt;
use crate::middlewares::jwt_authentication::UserIdFromToken;

#[tracing::instrument(name = "Search content handler", skip(retrieval_service, user_id, body))]
pub async fn search_content(
    retrieval_service: web::Data<ContentRetrievalService>,
    user_id: web::ReqData<UserIdFromToken>,
    body: web::Json<SearchContentBodyData>,
) -> Result<HttpResponse, SearchContentError> {
    info!("Searching contents for query: {}", body.query);

    let UserIdFromToken(user_id) = user_id.into_inner();
    let outcome = retrieval_service.search(user_id, &body.query).await?;

    let message = if outcome.relevant_content.is_empty() {
        "No relevant content found"
    } else {
        "Search results generated"
    };

    Ok(HttpResponse::Ok().json(json!({
        "message": message,
        "relevantContent": outcome.relevant_content,
        "answer": outcome.answer,
    })))
}

#[derive(Debug, serde::Deserialize)]
pub struct SearchContentBodyData {
    pub query: String,
}

#[derive(thiserror::Error)]
pub enum SearchContentError {
    #[error(transparent)]
    RetrievalError(#[from] ContentRetrievalError),
}

impl std::fmt::Debug for SearchContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SearchContentError {
    fn status_code(&self) -> StatusCode {
        match self {
            SearchContentError::RetrievalError(ContentRetrievalError::EmptyQuery) => {
                StatusCode::BAD_REQUEST
            }
            SearchContentError::RetrievalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from search_content handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
