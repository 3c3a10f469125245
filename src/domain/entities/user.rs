use chrono::{DateTime, Utc};
use secrecy::Secret;
use tracing::info;
use uuid::Uuid;

use crate::helper::error_chain_fmt;
use crate::telemetry::spawn_blocking_with_tracing;

use super::{
    user_name::{UserName, UserNameError},
    user_password::{UserPassword, UserPasswordError},
};

/// A user being created: validated username and freshly computed password hash
#[derive(Debug, Clone)]
pub struct CreatingUser {
    pub id: Uuid,
    pub username: UserName,
    pub password_hash: UserPassword,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreatingUser {
    /// Validates the username and hashes the password
    ///
    /// Hashing is CPU-intensive and runs on the blocking thread pool.
    pub async fn new(username: &str, password: Secret<String>) -> Result<Self, UserError> {
        let username = UserName::parse(username)?;
        info!(username = username.as_ref(), "Valid username");

        let password_hash =
            spawn_blocking_with_tracing(move || UserPassword::compute_password_hash(password))
                .await
                .map_err(|e| {
                    UserError::InternalError(format!(
                        "Unexpected error when spawning blocking thread: {}",
                        e
                    ))
                })??;

        Ok(CreatingUser {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }
}

/// A stored user being checked during login
#[derive(Debug, Clone)]
pub struct CheckingUser {
    pub id: Uuid,
    pub password_hash: Secret<String>,
}

impl CheckingUser {
    /// Verifies a password candidate against the stored PHC hash
    pub async fn verify_password_hash(
        &self,
        password_candidate: Secret<String>,
    ) -> Result<(), UserError> {
        let expected = UserPassword::parse(self.password_hash.clone())?;

        spawn_blocking_with_tracing(move || expected.verify(password_candidate))
            .await
            .map_err(|e| {
                UserError::InternalError(format!(
                    "Unexpected error when spawning blocking thread: {}",
                    e
                ))
            })?
            .map_err(|error| match error {
                UserPasswordError::InvalidCredentials(message) => {
                    UserError::InvalidCredentials(message)
                }
                other => other.into(),
            })
    }
}

#[derive(thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    PasswordError(#[from] UserPasswordError),
    #[error(transparent)]
    NameError(#[from] UserNameError),
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Internal: {0}")]
    InternalError(String),
}

impl std::fmt::Debug for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::Password;
    use fake::Fake;
    use secrecy::Secret;

    #[tokio::test]
    async fn valid_info_should_create_a_user() {
        let password = Password(8..24).fake();
        let password = Secret::new(password);

        let user = CreatingUser::new("ursula_42", password).await;

        assert!(user.is_ok())
    }

    #[tokio::test]
    async fn an_invalid_username_fails_creation() {
        let password = Password(8..24).fake();

        let user = CreatingUser::new("not a username", Secret::new(password)).await;

        assert!(matches!(user, Err(UserError::NameError(_))));
    }

    #[tokio::test]
    async fn a_created_user_can_be_checked_with_the_same_password() {
        let password: String = Password(8..24).fake();
        let user = CreatingUser::new("ursula_42", Secret::new(password.clone()))
            .await
            .unwrap();

        let checking = CheckingUser {
            id: user.id,
            password_hash: Secret::new(user.password_hash.as_ref().to_string()),
        };

        assert!(checking
            .verify_password_hash(Secret::new(password))
            .await
            .is_ok());
    }
}
