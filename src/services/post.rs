//! Post service
//!
//! Implements business logic for posts:
//! - Creation with validation (staff author, slug format, at least one tag)
//! - Listings: latest, most liked, by tag
//! - Attaching tags and comment counts to a page of posts in two batch queries
//! - Likes

use crate::db::repositories::{PostRepository, TagRepository, UserRepository};
use crate::models::{
    CreatePostInput, PostWithMeta, POST_SLUG_MAX_LEN, POST_TITLE_MAX_LEN,
};
use crate::services::tag::normalize_tag_title;
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Duplicate slug
    #[error("Post slug already exists: {0}")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    tag_repo: Arc<dyn TagRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl PostService {
    /// Create a new post service
    ///
    /// # Arguments
    /// * `repo` - Post repository
    /// * `tag_repo` - Tag repository for tag associations and batch lookups
    /// * `user_repo` - User repository for the staff check on authors
    pub fn new(
        repo: Arc<dyn PostRepository>,
        tag_repo: Arc<dyn TagRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            repo,
            tag_repo,
            user_repo,
        }
    }

    /// Create a new post
    ///
    /// An empty slug is generated from the title. Tag titles are normalized,
    /// deduplicated, and created when missing. `published_at` defaults to now.
    ///
    /// # Errors
    /// - `ValidationError` if the title, text, slug or tag list is invalid,
    ///   or the author is not a staff member
    /// - `NotFound` if the author does not exist
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, mut input: CreatePostInput) -> Result<PostWithMeta, PostServiceError> {
        input.title = input.title.trim().to_string();
        if input.title.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.title.chars().count() > POST_TITLE_MAX_LEN {
            return Err(PostServiceError::ValidationError(format!(
                "Title cannot exceed {} characters",
                POST_TITLE_MAX_LEN
            )));
        }
        if input.text.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Text cannot be empty".to_string(),
            ));
        }

        if input.slug.trim().is_empty() {
            input.slug = generate_slug(&input.title);
        }
        validate_slug(&input.slug).map_err(PostServiceError::ValidationError)?;

        let mut tag_titles: Vec<String> = Vec::with_capacity(input.tags.len());
        for raw in &input.tags {
            let title = normalize_tag_title(raw).map_err(PostServiceError::ValidationError)?;
            if !tag_titles.contains(&title) {
                tag_titles.push(title);
            }
        }
        if tag_titles.is_empty() {
            return Err(PostServiceError::ValidationError(
                "A post needs at least one tag".to_string(),
            ));
        }

        let author = self
            .user_repo
            .get_by_id(input.author_id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| {
                PostServiceError::NotFound(format!("Author with ID {} not found", input.author_id))
            })?;
        if !author.is_staff {
            return Err(PostServiceError::ValidationError(format!(
                "Author {} is not a staff member",
                author.username
            )));
        }

        input.tags = tag_titles;
        let published_at = input.published_at.unwrap_or_else(Utc::now);
        let post = match self.repo.create(&input, published_at).await {
            Ok(post) => post,
            Err(e) if is_unique_violation(&e) => {
                return Err(PostServiceError::DuplicateSlug(input.slug));
            }
            Err(e) => return Err(e.context("Failed to create post").into()),
        };

        tracing::info!(post_id = post.id, slug = %post.slug, "Created post");

        self.get_by_slug(&post.slug)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(post.slug.clone()))
    }

    /// Get a post by slug with its tags and comment count attached
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<PostWithMeta>, PostServiceError> {
        let post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?;

        match post {
            Some(post) => Ok(self.attach_meta(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Get a post by ID with its tags and comment count attached
    pub async fn get_by_id(&self, id: i64) -> Result<Option<PostWithMeta>, PostServiceError> {
        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post by ID")?;

        match post {
            Some(post) => Ok(self.attach_meta(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Newest posts first
    pub async fn latest(&self, limit: usize) -> Result<Vec<PostWithMeta>, PostServiceError> {
        let posts = self
            .repo
            .latest(limit)
            .await
            .context("Failed to list latest posts")?;
        self.attach_meta(posts).await
    }

    /// Most liked posts first, ties broken by newest first
    pub async fn popular(&self, limit: usize) -> Result<Vec<PostWithMeta>, PostServiceError> {
        let posts = self
            .repo
            .popular(limit)
            .await
            .context("Failed to list popular posts")?;
        self.attach_meta(posts).await
    }

    /// Newest posts carrying the given tag
    pub async fn list_by_tag(
        &self,
        tag_id: i64,
        limit: usize,
    ) -> Result<Vec<PostWithMeta>, PostServiceError> {
        let posts = self
            .repo
            .list_by_tag(tag_id, limit)
            .await
            .context("Failed to list posts by tag")?;
        self.attach_meta(posts).await
    }

    /// Like a post on behalf of a user. Liking twice has no effect.
    pub async fn like(&self, post_id: i64, user_id: i64) -> Result<(), PostServiceError> {
        self.ensure_exists(post_id).await?;
        self.repo
            .like(post_id, user_id)
            .await
            .context("Failed to like post")?;
        Ok(())
    }

    /// Withdraw a user's like
    pub async fn unlike(&self, post_id: i64, user_id: i64) -> Result<(), PostServiceError> {
        self.repo
            .unlike(post_id, user_id)
            .await
            .context("Failed to unlike post")?;
        Ok(())
    }

    /// Number of likes on a post
    pub async fn like_count(&self, post_id: i64) -> Result<i64, PostServiceError> {
        self.repo
            .like_count(post_id)
            .await
            .context("Failed to count likes")
            .map_err(Into::into)
    }

    /// Delete a post. Its comments, likes and tag links go with it.
    ///
    /// # Errors
    /// - `NotFound` if the post doesn't exist
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        self.ensure_exists(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete post")?;

        tracing::info!(post_id = id, "Deleted post");
        Ok(())
    }

    async fn ensure_exists(&self, id: i64) -> Result<(), PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .map(|_| ())
            .ok_or_else(|| PostServiceError::NotFound(format!("Post with ID {} not found", id)))
    }

    /// Fill `tags` and `comment_count` on every post with one query each
    async fn attach_meta(
        &self,
        mut posts: Vec<PostWithMeta>,
    ) -> Result<Vec<PostWithMeta>, PostServiceError> {
        if posts.is_empty() {
            return Ok(posts);
        }

        let ids: Vec<i64> = posts.iter().map(|p| p.post.id).collect();
        let mut tags = self
            .tag_repo
            .get_for_posts(&ids)
            .await
            .context("Failed to load tags for posts")?;
        let comment_counts = self
            .repo
            .comment_counts(&ids)
            .await
            .context("Failed to count comments")?;

        for post in &mut posts {
            post.tags = tags.remove(&post.post.id).unwrap_or_default();
            post.comment_count = comment_counts.get(&post.post.id).copied().unwrap_or(0);
        }

        Ok(posts)
    }
}

/// Whether a storage error is a UNIQUE constraint failure
fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
    )
}

/// Check a slug against the allowed format and length
pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.chars().count() > POST_SLUG_MAX_LEN {
        return Err(format!(
            "Slug cannot exceed {} characters",
            POST_SLUG_MAX_LEN
        ));
    }
    if !SLUG_RE.is_match(slug) {
        return Err(format!(
            "Slug '{}' may only contain letters, numbers, hyphens and underscores",
            slug
        ));
    }
    Ok(())
}

/// Generate a URL-friendly slug from a title
///
/// Lowercases ASCII letters and digits, turns every other run of characters
/// into a single hyphen and trims hyphens from both ends. Titles without any
/// ASCII alphanumerics produce an empty slug, which `validate_slug` rejects.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen && !result.is_empty() {
            result.push('-');
            prev_hyphen = true;
        }
    }

    let trimmed = result.trim_end_matches('-');
    trimmed.chars().take(POST_SLUG_MAX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CommentRepository, CommentRepositoryImpl, SqlxPostRepository, SqlxTagRepository,
        SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateCommentInput, CreateUserInput};
    use chrono::Duration;

    struct Fixture {
        pool: DynDatabasePool,
        service: PostService,
        staff_id: i64,
        reader_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let staff_id = user_repo
            .create(&CreateUserInput::new("editor", true))
            .await
            .unwrap()
            .id;
        let reader_id = user_repo
            .create(&CreateUserInput::new("reader", false))
            .await
            .unwrap()
            .id;

        let service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
            user_repo,
        );

        Fixture {
            pool,
            service,
            staff_id,
            reader_id,
        }
    }

    fn input(slug: &str, author_id: i64) -> CreatePostInput {
        CreatePostInput::new(format!("Post {}", slug), "Some body text", slug, author_id)
            .with_tags(["general"])
    }

    // ========================================================================
    // Slug helpers
    // ========================================================================

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Hello,   World!  "), "hello-world");
        assert_eq!(generate_slug("Привет"), "");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("hello-world_2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("hello world").is_err());
        assert!(validate_slug("héllo").is_err());
        assert!(validate_slug(&"a".repeat(201)).is_err());
    }

    // ========================================================================
    // Creation rules
    // ========================================================================

    #[tokio::test]
    async fn test_create_post_with_tags() {
        let f = setup().await;

        let post = f
            .service
            .create(
                CreatePostInput::new("Hello", "Body", "hello", f.staff_id)
                    .with_tags(["Rust", "web", "rust"]),
            )
            .await
            .expect("Failed to create post");

        assert_eq!(post.post.author_username, "editor");
        let titles: Vec<&str> = post.tags.iter().map(|t| t.tag.title.as_str()).collect();
        assert_eq!(titles, vec!["rust", "web"]);
        assert_eq!(post.comment_count, 0);
        assert_eq!(post.like_count, 0);
    }

    #[tokio::test]
    async fn test_create_generates_slug_from_title() {
        let f = setup().await;

        let post = f
            .service
            .create(
                CreatePostInput::new("My First Post", "Body", "", f.staff_id).with_tags(["misc"]),
            )
            .await
            .unwrap();
        assert_eq!(post.post.slug, "my-first-post");
    }

    #[tokio::test]
    async fn test_create_with_non_staff_author_fails() {
        let f = setup().await;

        let result = f.service.create(input("nope", f.reader_id)).await;
        assert!(matches!(result, Err(PostServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_with_missing_author_fails() {
        let f = setup().await;

        let result = f.service.create(input("ghost", 9999)).await;
        assert!(matches!(result, Err(PostServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_without_tags_fails() {
        let f = setup().await;

        let result = f
            .service
            .create(CreatePostInput::new("Bare", "Body", "bare", f.staff_id))
            .await;
        assert!(matches!(result, Err(PostServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_with_invalid_fields_fails() {
        let f = setup().await;

        let bad_inputs = vec![
            CreatePostInput::new("", "Body", "empty-title", f.staff_id).with_tags(["a"]),
            CreatePostInput::new("x".repeat(201), "Body", "long-title", f.staff_id).with_tags(["a"]),
            CreatePostInput::new("Title", "   ", "empty-text", f.staff_id).with_tags(["a"]),
            CreatePostInput::new("Title", "Body", "bad slug", f.staff_id).with_tags(["a"]),
            CreatePostInput::new("Title", "Body", "long-tag", f.staff_id)
                .with_tags(["x".repeat(21)]),
        ];

        for bad in bad_inputs {
            let slug = bad.slug.clone();
            let result = f.service.create(bad).await;
            assert!(
                matches!(result, Err(PostServiceError::ValidationError(_))),
                "expected validation error for {}",
                slug
            );
        }
    }

    #[tokio::test]
    async fn test_create_duplicate_slug_fails() {
        let f = setup().await;
        f.service.create(input("same", f.staff_id)).await.unwrap();

        let result = f.service.create(input("same", f.staff_id)).await;
        assert!(matches!(result, Err(PostServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_rejected_duplicate_leaves_no_new_tags() {
        let f = setup().await;
        f.service.create(input("same", f.staff_id)).await.unwrap();

        let again = CreatePostInput::new("Again", "Other body", "same", f.staff_id)
            .with_tags(["brand-new"]);
        let result = f.service.create(again).await;
        assert!(matches!(result, Err(PostServiceError::DuplicateSlug(slug)) if slug == "same"));

        let tag_repo = SqlxTagRepository::new(f.pool.clone());
        assert!(tag_repo.get_by_title("brand-new").await.unwrap().is_none());
        assert_eq!(f.service.latest(10).await.unwrap().len(), 1);
    }

    // ========================================================================
    // Listings and metadata
    // ========================================================================

    #[tokio::test]
    async fn test_popular_orders_by_likes() {
        let f = setup().await;
        let user_repo = SqlxUserRepository::new(f.pool.clone());
        let mut likers = vec![f.reader_id];
        for name in ["b", "c"] {
            likers.push(user_repo.create(&CreateUserInput::new(name, false)).await.unwrap().id);
        }

        let one = f.service.create(input("one-like", f.staff_id)).await.unwrap();
        let three = f.service.create(input("three-likes", f.staff_id)).await.unwrap();
        f.service.like(one.post.id, likers[0]).await.unwrap();
        for liker in &likers {
            f.service.like(three.post.id, *liker).await.unwrap();
        }

        let popular = f.service.popular(5).await.unwrap();
        assert_eq!(popular[0].post.slug, "three-likes");
        assert_eq!(popular[0].like_count, 3);
        assert_eq!(popular[1].post.slug, "one-like");
        assert!(popular.windows(2).all(|w| w[0].like_count >= w[1].like_count));
        // Tags are attached to popular posts too
        assert_eq!(popular[0].first_tag().map(|t| t.tag.title.as_str()), Some("general"));
    }

    #[tokio::test]
    async fn test_latest_attaches_comment_counts() {
        let f = setup().await;
        let comments = CommentRepositoryImpl::new(f.pool.clone());

        let older = f
            .service
            .create(input("older", f.staff_id).with_published_at(Utc::now() - Duration::days(1)))
            .await
            .unwrap();
        let newer = f.service.create(input("newer", f.staff_id)).await.unwrap();

        for text in ["one", "two"] {
            comments
                .create(&CreateCommentInput::new(older.post.id, f.reader_id, text), Utc::now())
                .await
                .unwrap();
        }

        let latest = f.service.latest(5).await.unwrap();
        assert_eq!(latest[0].post.id, newer.post.id);
        assert_eq!(latest[0].comment_count, 0);
        assert_eq!(latest[1].post.id, older.post.id);
        assert_eq!(latest[1].comment_count, 2);
    }

    #[tokio::test]
    async fn test_list_by_tag() {
        let f = setup().await;
        let tag_repo = SqlxTagRepository::new(f.pool.clone());
        f.service
            .create(input("tagged", f.staff_id).with_tags(["special"]))
            .await
            .unwrap();
        f.service.create(input("other", f.staff_id)).await.unwrap();

        let special = tag_repo.get_by_title("special").await.unwrap().unwrap();
        let posts = f.service.list_by_tag(special.id, 20).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post.slug, "tagged");
    }

    #[tokio::test]
    async fn test_like_missing_post_fails() {
        let f = setup().await;
        let result = f.service.like(12345, f.reader_id).await;
        assert!(matches!(result, Err(PostServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_like_and_unlike() {
        let f = setup().await;
        let post = f.service.create(input("liked", f.staff_id)).await.unwrap();

        f.service.like(post.post.id, f.reader_id).await.unwrap();
        f.service.like(post.post.id, f.reader_id).await.unwrap();
        assert_eq!(f.service.like_count(post.post.id).await.unwrap(), 1);

        f.service.unlike(post.post.id, f.reader_id).await.unwrap();
        assert_eq!(f.service.like_count(post.post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_comments() {
        let f = setup().await;
        let comments = CommentRepositoryImpl::new(f.pool.clone());
        let post = f.service.create(input("doomed", f.staff_id)).await.unwrap();
        comments
            .create(&CreateCommentInput::new(post.post.id, f.reader_id, "hi"), Utc::now())
            .await
            .unwrap();

        f.service.delete(post.post.id).await.unwrap();

        assert!(f.service.get_by_slug("doomed").await.unwrap().is_none());
        assert!(comments.list_by_post(post.post.id).await.unwrap().is_empty());
        assert!(matches!(
            f.service.delete(post.post.id).await,
            Err(PostServiceError::NotFound(_))
        ));
    }
}
