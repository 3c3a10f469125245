use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::domain::entities::content_item::{ContentItem, ContentType as ItemContentType};
use crate::helper::error_chain_fmt;
use crate::middlewares::jwt_authentication::UserIdFromToken;
use crate::repositories::content_postgres_repository::{
    ContentPostgresRepository, ContentPostgresRepositoryError,
};

const STARTER_TITLE: &str = "Welcome to your second brain";
const STARTER_CONTENT: &str =
    "Save notes and links here, then search them with natural language questions.";

#[tracing::instrument(name = "List contents handler", skip(pool, content_repository, user_id))]
pub async fn list_contents(
    pool: web::Data<PgPool>,
    content_repository: web::Data<ContentPostgresRepository>,
    user_id: web::ReqData<UserIdFromToken>,
) -> Result<HttpResponse, ListContentsError> {
    let UserIdFromToken(user_id) = user_id.into_inner();

    let mut contents = content_repository
        .get_contents_for_owner(&**pool, user_id)
        .await?;

    // A brand new brain is never empty: seed it with one starter note. It is
    // plain UI content and gets no vector record, so it never pollutes search.
    if contents.is_empty() {
        let starter = ContentItem::new(
            user_id,
            STARTER_TITLE.to_string(),
            None,
            ItemContentType::Note,
            STARTER_CONTENT.to_string(),
            None,
        );

        content_repository.add_content(&**pool, &starter).await?;
        info!(content_id = %starter.id, "Seeded starter note for empty brain");

        contents.push(starter);
    }

    Ok(HttpResponse::Ok().json(json!({ "content": contents })))
}

#[derive(thiserror::Error)]
pub enum ListContentsError {
    #[error(transparent)]
    RepositoryError(#[from] ContentPostgresRepositoryError),
}

impl std::fmt::Debug for ListContentsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ListContentsError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    #[tracing::instrument(name = "Response error from list_contents handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
