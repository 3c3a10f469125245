use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;

use crate::domain::entities::content_item::ContentType as ItemContentType;
use crate::domain::services::content_ingestion::{
    ContentIngestionError, ContentIngestionService, NewContent,
};
use crate::helper::error_chain_fmt;
use crate::middlewares::jwt_authentication::UserIdFromToken;

#[tracing::instrument(name = "Add content handler", skip(ingestion_service, user_id, body))]
pub async fn add_content(
    ingestion_service: web::Data<ContentIngestionService>,
    user_id: web::ReqData<UserIdFromToken>,
    body: web::Json<AddContentBodyData>,
) -> Result<HttpResponse, AddContentError> {
    let UserIdFromToken(user_id) = user_id.into_inner();
    let AddContentBodyData {
        link,
        title,
        content_type,
        content,
    } = body.into_inner();

    let item = ingestion_service
        .add_content(
            user_id,
            NewContent {
                title,
                link,
                content_type,
                content,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Content added",
        "contentId": item.id,
        "imageUrl": item.image_url,
    })))
}

#[derive(Debug, serde::Deserialize)]
pub struct AddContentBodyData {
    pub link: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ItemContentType,
    #[serde(default)]
    pub content: String,
}

#[derive(thiserror::Error)]
pub enum AddContentError {
    #[error(transparent)]
    IngestionError(#[from] ContentIngestionError),
}

impl std::fmt::Debug for AddContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AddContentError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Embedding/index failures are not absorbed: the caller must learn
            // the item is not searchable, even though the primary record is in
            AddContentError::IngestionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from add_content handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
