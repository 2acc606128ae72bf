//! Comment service

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::db::repositories::{CommentRepository, PostRepository, UserRepository};
use crate::models::{CommentWithAuthor, CreateCommentInput};

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            user_repo,
        }
    }

    /// Create a comment
    ///
    /// Returns the stored comment with the author's username and post title.
    pub async fn create(
        &self,
        mut input: CreateCommentInput,
    ) -> Result<CommentWithAuthor, CommentServiceError> {
        input.text = input.text.trim().to_string();
        if input.text.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment text cannot be empty".to_string(),
            ));
        }

        if self
            .post_repo
            .get_by_id(input.post_id)
            .await
            .context("Failed to get post")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound(format!(
                "Post with ID {} not found",
                input.post_id
            )));
        }
        if self
            .user_repo
            .get_by_id(input.author_id)
            .await
            .context("Failed to get author")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound(format!(
                "User with ID {} not found",
                input.author_id
            )));
        }

        let published_at = input.published_at.unwrap_or_else(Utc::now);
        let comment = self
            .repo
            .create(&input, published_at)
            .await
            .context("Failed to create comment")?;

        tracing::debug!(comment_id = comment.id, post_id = comment.post_id, "Created comment");

        self.repo
            .get_by_id(comment.id)
            .await
            .context("Failed to reload comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("Comment {}", comment.id)))
    }

    /// Comments of a post, oldest first
    pub async fn list_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        self.repo
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")
            .map_err(Into::into)
    }

    /// Get a comment by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<CommentWithAuthor>, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")
            .map_err(Into::into)
    }

    /// Delete a comment
    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete comment")?;

        if !deleted {
            return Err(CommentServiceError::NotFound(format!(
                "Comment with ID {} not found",
                id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CommentRepositoryImpl, SqlxPostRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreatePostInput, CreateUserInput};
    use chrono::Duration;

    async fn setup() -> (CommentService, i64, i64) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let author = user_repo
            .create(&CreateUserInput::new("alice", true))
            .await
            .unwrap();
        let post = post_repo
            .create(
                &CreatePostInput::new("Hello", "Body", "hello", author.id),
                Utc::now(),
            )
            .await
            .unwrap();

        let service = CommentService::new(
            Arc::new(CommentRepositoryImpl::new(pool.clone())),
            post_repo,
            user_repo,
        );
        (service, author.id, post.id)
    }

    #[tokio::test]
    async fn test_create_comment() {
        let (service, author_id, post_id) = setup().await;

        let comment = service
            .create(CreateCommentInput::new(post_id, author_id, "  Great read  "))
            .await
            .unwrap();

        assert_eq!(comment.comment.text, "Great read");
        assert_eq!(comment.author_username, "alice");
        assert_eq!(comment.to_string(), "alice under Hello");
    }

    #[tokio::test]
    async fn test_create_empty_comment_fails() {
        let (service, author_id, post_id) = setup().await;

        let result = service
            .create(CreateCommentInput::new(post_id, author_id, "   "))
            .await;
        assert!(matches!(result, Err(CommentServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_on_missing_post_fails() {
        let (service, author_id, _post_id) = setup().await;

        let result = service
            .create(CreateCommentInput::new(404, author_id, "Hello?"))
            .await;
        assert!(matches!(result, Err(CommentServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_by_missing_user_fails() {
        let (service, _author_id, post_id) = setup().await;

        let result = service
            .create(CreateCommentInput::new(post_id, 404, "Hello?"))
            .await;
        assert!(matches!(result, Err(CommentServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_for_post_oldest_first() {
        let (service, author_id, post_id) = setup().await;
        let now = Utc::now();

        service
            .create(CreateCommentInput::new(post_id, author_id, "second").with_published_at(now))
            .await
            .unwrap();
        service
            .create(
                CreateCommentInput::new(post_id, author_id, "first")
                    .with_published_at(now - Duration::hours(1)),
            )
            .await
            .unwrap();

        let texts: Vec<String> = service
            .list_for_post(post_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.comment.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_delete_comment() {
        let (service, author_id, post_id) = setup().await;
        let comment = service
            .create(CreateCommentInput::new(post_id, author_id, "oops"))
            .await
            .unwrap();

        service.delete(comment.comment.id).await.unwrap();
        assert!(service.get_by_id(comment.comment.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete(comment.comment.id).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
