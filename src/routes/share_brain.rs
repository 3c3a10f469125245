use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::domain::entities::share_link::ShareLink;
use crate::helper::error_chain_fmt;
use crate::middlewares::jwt_authentication::UserIdFromToken;
use crate::repositories::share_link_postgres_repository::{
    ShareLinkPostgresRepository, ShareLinkPostgresRepositoryError,
};

/// Enables or disables sharing of the caller's whole brain
///
/// Enabling is idempotent: a second enable returns the hash created the first
/// time. Disabling destroys the link; the hash stops resolving.
#[tracing::instrument(name = "Share brain handler", skip(pool, share_link_repository, user_id, body))]
pub async fn share_brain(
    pool: web::Data<PgPool>,
    share_link_repository: web::Data<ShareLinkPostgresRepository>,
    user_id: web::ReqData<UserIdFromToken>,
    body: web::Json<ShareBrainBodyData>,
) -> Result<HttpResponse, ShareBrainError> {
    let UserIdFromToken(user_id) = user_id.into_inner();

    if !body.share {
        share_link_repository
            .delete_for_user(&**pool, user_id)
            .await?;

        info!("Sharing disabled");
        return Ok(HttpResponse::Ok().json(json!({ "message": "Sharing disabled" })));
    }

    if let Some(existing) = share_link_repository.get_for_user(&**pool, user_id).await? {
        info!("Sharing already enabled, returning existing link");
        return Ok(HttpResponse::Ok().json(json!({ "hash": existing.hash })));
    }

    let share_link = ShareLink::create(user_id);
    share_link_repository
        .add_share_link(&**pool, &share_link)
        .await?;

    info!("Sharing enabled");
    Ok(HttpResponse::Ok().json(json!({ "hash": share_link.hash })))
}

#[derive(Debug, serde::Deserialize)]
pub struct ShareBrainBodyData {
    pub share: bool,
}

#[derive(thiserror::Error)]
pub enum ShareBrainError {
    #[error(transparent)]
    RepositoryError(#[from] ShareLinkPostgresRepositoryError),
}

impl std::fmt::Debug for ShareBrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ShareBrainError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    #[tracing::instrument(name = "Response error from share_brain handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
