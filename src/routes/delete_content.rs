use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use uuid::Uuid;

use crate::domain::services::content_ingestion::{ContentIngestionError, ContentIngestionService};
use crate::helper::error_chain_fmt;
use crate::middlewares::jwt_authentication::UserIdFromToken;

/// Deletes one content item
///
/// Responds with the same success message whether the id existed or not: a
/// caller probing ids they do not own must not be able to tell "not mine"
/// from "not found".
#[tracing::instrument(name = "Delete content handler", skip(ingestion_service, user_id))]
pub async fn delete_content(
    ingestion_service: web::Data<ContentIngestionService>,
    user_id: web::ReqData<UserIdFromToken>,
    path: web::Path<String>,
) -> Result<HttpResponse, DeleteContentError> {
    let UserIdFromToken(user_id) = user_id.into_inner();
    let content_id = Uuid::parse_str(&path.into_inner())
        .map_err(|_| DeleteContentError::InvalidContentId())?;

    ingestion_service
        .delete_content(user_id, content_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Content deleted" })))
}

#[derive(thiserror::Error)]
pub enum DeleteContentError {
    #[error("Invalid content id")]
    InvalidContentId(),
    #[error(transparent)]
    IngestionError(#[from] ContentIngestionError),
}

impl std::fmt::Debug for DeleteContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for DeleteContentError {
    fn status_code(&self) -> StatusCode {
        match self {
            DeleteContentError::InvalidContentId() => StatusCode::BAD_REQUEST,
            DeleteContentError::IngestionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from delete_content handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
