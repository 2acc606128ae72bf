//! Tag service
//!
//! Implements business logic for tags:
//! - Title normalization (trimmed, lowercase, at most 20 characters)
//! - Create or reuse tags by title
//! - Popular tags by post count
//! - Tag-post associations

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagWithCount, TAG_TITLE_MAX_LEN};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for managing blog tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Create a new tag or get the existing one with the same title
    ///
    /// The title is normalized first, so `" Rust "` and `"rust"` resolve to
    /// the same tag.
    ///
    /// # Errors
    /// - `ValidationError` if the title is empty or too long
    pub async fn create_or_get(&self, title: &str) -> Result<Tag, TagServiceError> {
        let title = normalize_tag_title(title).map_err(TagServiceError::ValidationError)?;

        if let Some(existing) = self
            .repo
            .get_by_title(&title)
            .await
            .context("Failed to check existing tag")?
        {
            return Ok(existing);
        }

        let created = self
            .repo
            .create(&Tag::new(title))
            .await
            .context("Failed to create tag")?;

        tracing::debug!(tag_id = created.id, title = %created.title, "Created tag");
        Ok(created)
    }

    /// Get tag by exact title
    pub async fn get_by_title(&self, title: &str) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_title(title)
            .await
            .context("Failed to get tag by title")
            .map_err(Into::into)
    }

    /// Get tag by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")
            .map_err(Into::into)
    }

    /// List all tags ordered by title
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// Most used tags
    ///
    /// Returns up to `limit` tags sorted by post count in descending order,
    /// ties broken alphabetically.
    pub async fn popular(&self, limit: usize) -> Result<Vec<TagWithCount>, TagServiceError> {
        self.repo
            .popular(limit)
            .await
            .context("Failed to get popular tags")
            .map_err(Into::into)
    }

    /// Tags of each given post, keyed by post ID
    pub async fn get_for_posts(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<TagWithCount>>, TagServiceError> {
        self.repo
            .get_for_posts(post_ids)
            .await
            .context("Failed to get tags for posts")
            .map_err(Into::into)
    }

    /// Delete a tag
    ///
    /// Post associations are removed by the database.
    ///
    /// # Errors
    /// - `NotFound` if the tag doesn't exist
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        let tag = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag with ID {} not found", id)))?;

        self.repo
            .delete(tag.id)
            .await
            .context("Failed to delete tag")?;

        Ok(())
    }

    /// Add a tag to a post. Adding an existing association is a no-op.
    pub async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<(), TagServiceError> {
        self.repo
            .add_to_post(tag_id, post_id)
            .await
            .context("Failed to add tag to post")
            .map_err(Into::into)
    }

    /// Remove a tag from a post
    pub async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<(), TagServiceError> {
        self.repo
            .remove_from_post(tag_id, post_id)
            .await
            .context("Failed to remove tag from post")
            .map_err(Into::into)
    }
}

/// Normalize a tag title: trim surrounding whitespace and lowercase it.
///
/// Returns an error message when the result is empty or longer than
/// [`TAG_TITLE_MAX_LEN`] characters.
pub fn normalize_tag_title(title: &str) -> Result<String, String> {
    let normalized = title.trim().to_lowercase();

    if normalized.is_empty() {
        return Err("Tag title cannot be empty".to_string());
    }
    if normalized.chars().count() > TAG_TITLE_MAX_LEN {
        return Err(format!(
            "Tag title cannot exceed {} characters",
            TAG_TITLE_MAX_LEN
        ));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, TagService) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = SqlxTagRepository::boxed(pool.clone());
        let service = TagService::new(repo);

        (pool, service)
    }

    #[test]
    fn test_normalize_tag_title() {
        assert_eq!(normalize_tag_title("  Rust ").unwrap(), "rust");
        assert_eq!(normalize_tag_title("WebDev").unwrap(), "webdev");
        assert!(normalize_tag_title("   ").is_err());
        assert!(normalize_tag_title(&"x".repeat(21)).is_err());
        assert!(normalize_tag_title(&"x".repeat(20)).is_ok());
    }

    #[test]
    fn test_normalize_counts_characters_not_bytes() {
        // 20 two-byte characters fit
        let title = "é".repeat(20);
        assert_eq!(normalize_tag_title(&title).unwrap(), title);
    }

    #[tokio::test]
    async fn test_create_or_get_creates_new_tag() {
        let (_pool, service) = setup_test_service().await;

        let tag = service.create_or_get("Rust").await.expect("Failed to create tag");

        assert!(tag.id > 0);
        assert_eq!(tag.title, "rust");
    }

    #[tokio::test]
    async fn test_create_or_get_returns_existing_tag() {
        let (_pool, service) = setup_test_service().await;

        let first = service.create_or_get("news").await.unwrap();
        let second = service.create_or_get("NEWS ").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_or_get_empty_title_fails() {
        let (_pool, service) = setup_test_service().await;

        let result = service.create_or_get("  ").await;
        assert!(matches!(result, Err(TagServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_get_by_title_is_exact() {
        let (_pool, service) = setup_test_service().await;
        service.create_or_get("rust").await.unwrap();

        assert!(service.get_by_title("rust").await.unwrap().is_some());
        assert!(service.get_by_title("Rust").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_tag_fails() {
        let (_pool, service) = setup_test_service().await;

        let result = service.delete(999).await;
        assert!(matches!(result, Err(TagServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_tag() {
        let (_pool, service) = setup_test_service().await;
        let tag = service.create_or_get("temp").await.unwrap();

        service.delete(tag.id).await.unwrap();
        assert!(service.get_by_id(tag.id).await.unwrap().is_none());
    }
}
