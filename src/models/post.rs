//! Post model
//!
//! This module provides:
//! - `Post` entity, with the author's username joined in
//! - `PostWithMeta`, a post together with its tags and aggregate counts
//! - `CreatePostInput` for the post service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TagWithCount;

/// Maximum length of a post title, in characters
pub const POST_TITLE_MAX_LEN: usize = 200;

/// Maximum length of a post slug, in characters
pub const POST_SLUG_MAX_LEN: usize = 200;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// Full body text
    pub text: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Image path relative to the media root
    pub image: Option<String>,
    /// Publication timestamp
    pub published_at: DateTime<Utc>,
    /// Author user ID
    pub author_id: i64,
    /// Author username, joined from `users`
    pub author_username: String,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// A post with its tags, comment count and like count attached.
///
/// The counts are filled by batch queries in the post service; they are
/// never stored on the post row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    /// Tags ordered by title, each with its own post count
    #[serde(default)]
    pub tags: Vec<TagWithCount>,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub like_count: i64,
}

impl PostWithMeta {
    /// Wrap a post with no tags and zero counts
    pub fn new(post: Post) -> Self {
        Self {
            post,
            tags: Vec::new(),
            comment_count: 0,
            like_count: 0,
        }
    }

    /// The first tag by title, if the post has any
    pub fn first_tag(&self) -> Option<&TagWithCount> {
        self.tags.first()
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub text: String,
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Defaults to now when absent
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: i64,
    /// Tag titles; missing tags are created
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreatePostInput {
    pub fn new(title: impl Into<String>, text: impl Into<String>, slug: impl Into<String>, author_id: i64) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            slug: slug.into(),
            image: None,
            published_at: None,
            author_id,
            tags: Vec::new(),
        }
    }

    /// Set the image path
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the publication timestamp
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Set the tag titles
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;

    fn sample_post() -> Post {
        Post {
            id: 1,
            title: "Hello".to_string(),
            text: "Body".to_string(),
            slug: "hello".to_string(),
            image: None,
            published_at: Utc::now(),
            author_id: 1,
            author_username: "editor".to_string(),
        }
    }

    #[test]
    fn test_post_display_is_title() {
        assert_eq!(sample_post().to_string(), "Hello");
    }

    #[test]
    fn test_post_with_meta_first_tag() {
        let mut meta = PostWithMeta::new(sample_post());
        assert!(meta.first_tag().is_none());

        meta.tags.push(TagWithCount::new(Tag::new("alpha".to_string()), 1));
        meta.tags.push(TagWithCount::new(Tag::new("beta".to_string()), 2));
        assert_eq!(meta.first_tag().map(|t| t.tag.title.as_str()), Some("alpha"));
    }

    #[test]
    fn test_create_post_input_builders() {
        let published = Utc::now();
        let input = CreatePostInput::new("Title", "Text", "title", 7)
            .with_image("posts/cover.png")
            .with_published_at(published)
            .with_tags(["rust", "web"]);

        assert_eq!(input.image.as_deref(), Some("posts/cover.png"));
        assert_eq!(input.published_at, Some(published));
        assert_eq!(input.tags, vec!["rust".to_string(), "web".to_string()]);
        assert_eq!(input.author_id, 7);
    }
}
