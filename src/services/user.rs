//! User service
//!
//! The blog does not manage accounts itself; this service only covers what
//! the rest of the system needs: creating authors and commenters (used by
//! the demo seed and tests) and looking them up.

use crate::db::repositories::UserRepository;
use crate::models::{CreateUserInput, User};
use anyhow::Context;
use std::sync::Arc;

/// Maximum length of a username, in characters
pub const USERNAME_MAX_LEN: usize = 150;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Create a user
    ///
    /// # Errors
    /// - `ValidationError` if the username is empty, too long or contains whitespace
    /// - `DuplicateUsername` if the username is taken
    pub async fn create(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = input.username.trim();
        validate_username(username).map_err(UserServiceError::ValidationError)?;

        if self
            .repo
            .get_by_username(username)
            .await
            .context("Failed to check username uniqueness")?
            .is_some()
        {
            return Err(UserServiceError::DuplicateUsername(username.to_string()));
        }

        let input = CreateUserInput::new(username, input.is_staff);
        let user = self.repo.create(&input).await.context("Failed to create user")?;

        tracing::info!(user_id = user.id, username = %user.username, is_staff = user.is_staff, "Created user");
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")
            .map_err(Into::into)
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        self.repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")
            .map_err(Into::into)
    }

    /// Count all users
    pub async fn count(&self) -> Result<i64, UserServiceError> {
        self.repo
            .count()
            .await
            .context("Failed to count users")
            .map_err(Into::into)
    }
}

fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Username cannot exceed {} characters",
            USERNAME_MAX_LEN
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err("Username cannot contain whitespace".to_string());
    }
    Ok(())
}
