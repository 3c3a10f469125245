use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::helper::error_chain_fmt;
use crate::repositories::content_postgres_repository::{
    ContentPostgresRepository, ContentPostgresRepositoryError,
};
use crate::repositories::share_link_postgres_repository::{
    ShareLinkPostgresRepository, ShareLinkPostgresRepositoryError,
};
use crate::repositories::user_postgres_repository::{
    UserPostgresRepository, UserPostgresRepositoryError,
};

/// Public read-only view of a shared brain, no authentication
///
/// The opaque hash is the only capability needed: it resolves to the sharing
/// user, whose username and full content list are returned.
#[tracing::instrument(
    name = "Shared brain handler",
    skip(pool, share_link_repository, user_repository, content_repository)
)]
pub async fn shared_brain(
    pool: web::Data<PgPool>,
    share_link_repository: web::Data<ShareLinkPostgresRepository>,
    user_repository: web::Data<UserPostgresRepository>,
    content_repository: web::Data<ContentPostgresRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, SharedBrainError> {
    let hash = path.into_inner();

    let user_id = share_link_repository
        .resolve_hash(&**pool, &hash)
        .await?
        .ok_or(SharedBrainError::UnknownShareLink())?;

    let username = user_repository.get_username(&**pool, user_id).await?;
    let contents = content_repository
        .get_contents_for_owner(&**pool, user_id)
        .await?;

    info!(username, "Serving shared brain");
    Ok(HttpResponse::Ok().json(json!({
        "username": username,
        "content": contents,
    })))
}

#[derive(thiserror::Error)]
pub enum SharedBrainError {
    #[error("Share link does not exist")]
    UnknownShareLink(),
    #[error(transparent)]
    ShareLinkRepositoryError(#[from] ShareLinkPostgresRepositoryError),
    #[error(transparent)]
    UserRepositoryError(#[from] UserPostgresRepositoryError),
    #[error(transparent)]
    ContentRepositoryError(#[from] ContentPostgresRepositoryError),
}

impl std::fmt::Debug for SharedBrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SharedBrainError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Kept for wire compatibility with the original surface
            SharedBrainError::UnknownShareLink() => StatusCode::LENGTH_REQUIRED,
            SharedBrainError::ShareLinkRepositoryError(_)
            | SharedBrainError::UserRepositoryError(_)
            | SharedBrainError::ContentRepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from shared_brain handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
