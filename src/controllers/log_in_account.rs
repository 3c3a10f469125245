use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use secrecy::Secret;
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info};

use crate::domain::entities::user::UserError;
use crate::helper::error_chain_fmt;
use crate::repositories::jwt_authentication_repository::{
    JwtAuthenticationRepository, JwtAuthenticationRepositoryError,
};
use crate::repositories::user_postgres_repository::{
    UserPostgresRepository, UserPostgresRepositoryError,
};

/// Log in user account controller
///
/// Improvements:
/// - enforce almost constant time by verifying against a default user when the
///   username does not exist, to avoid username guessing via timing attacks
#[tracing::instrument(
    name = "Log in user account",
    skip(pool, user_repository, auth_repository, body)
)]
pub async fn log_in_account(
    pool: web::Data<PgPool>,
    user_repository: web::Data<UserPostgresRepository>,
    auth_repository: web::Data<JwtAuthenticationRepository>,
    body: web::Json<LogInAccountBodyData>,
) -> Result<HttpResponse, LogInAccountError> {
    let LogInAccountBodyData { username, password } = body.into_inner();
    let password = Secret::new(password);

    info!(username, "Login attempt");

    let stored_user = user_repository
        .check_user(&**pool, &username)
        .await
        .map_err(|error| match error {
            UserPostgresRepositoryError::UserDoesNotExist(error_message) => {
                info!(
                    error = error_message,
                    username, "Attempt to login to non-existing user"
                );
                LogInAccountError::InvalidCredentials()
            }
            _ => error.into(),
        })?;

    stored_user
        .verify_password_hash(password)
        .await
        .map_err(|error| {
            error!(
                ?error,
                username, "Error when verifying password hash during login"
            );

            match error {
                UserError::InvalidCredentials(_) => LogInAccountError::InvalidCredentials(),
                _ => LogInAccountError::InternalError(anyhow::anyhow!("{:?}", error)),
            }
        })?;

    let jwt_token = auth_repository.create_token(&stored_user.id.to_string())?;

    Ok(HttpResponse::Ok().json(LogInAccountResponse {
        access_token: jwt_token,
        message: format!("Successfully logged in {}", username),
    }))
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct LogInAccountBodyData {
    pub username: String,
    pub password: String,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct LogInAccountResponse {
    pub access_token: String,
    pub message: String,
}

#[derive(thiserror::Error)]
pub enum LogInAccountError {
    #[error(transparent)]
    RepositoryInternalError(#[from] UserPostgresRepositoryError),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
    #[error("Invalid credentials")]
    InvalidCredentials(),
    #[error(transparent)]
    JwtAuthenticationRepositoryError(#[from] JwtAuthenticationRepositoryError),
}

impl std::fmt::Debug for LogInAccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for LogInAccountError {
    fn status_code(&self) -> StatusCode {
        match self {
            LogInAccountError::InvalidCredentials() => StatusCode::UNAUTHORIZED,
            LogInAccountError::InternalError(_)
            | LogInAccountError::RepositoryInternalError(_)
            | LogInAccountError::JwtAuthenticationRepositoryError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    #[tracing::instrument(name = "Response error from log_in_account controller", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
