//! Template context serializers
//!
//! Pure functions turning models into the flat structures the page templates
//! consume. Nothing here touches the database.

use serde::{Deserialize, Serialize};

use crate::models::{CommentWithAuthor, PostWithMeta, TagWithCount};

/// Number of characters of post text shown in listings
pub const TEASER_LEN: usize = 200;

// ============================================================================
// Response Types
// ============================================================================

/// Tag as shown in listings and the tag sidebar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagResponse {
    pub title: String,
    pub posts_with_tag: i64,
}

/// Post card used in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponse {
    pub title: String,
    pub teaser_text: String,
    /// Whether `teaser_text` stops short of the full text
    pub teaser_truncated: bool,
    pub author: String,
    pub comments_amount: i64,
    pub image_url: Option<String>,
    pub published_at: String,
    pub slug: String,
    pub tags: Vec<TagResponse>,
    pub first_tag_title: Option<String>,
}

/// Compact post entry for the "most popular" sidebar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostShortResponse {
    pub title: String,
    pub author: String,
    pub published_at: String,
    pub slug: String,
}

/// Compact post entry for the front page's "most popular" block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostShortIndexResponse {
    pub title: String,
    pub image_url: Option<String>,
    pub published_at: String,
    pub slug: String,
    pub first_tag_title: Option<String>,
}

/// Comment under a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentResponse {
    pub text: String,
    pub published_at: String,
    pub author: String,
}

/// Full post for the detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub title: String,
    pub text: String,
    pub author: String,
    pub comments: Vec<CommentResponse>,
    pub likes_amount: i64,
    pub image_url: Option<String>,
    pub published_at: String,
    pub slug: String,
    pub tags: Vec<TagResponse>,
}

// ============================================================================
// Serializers
// ============================================================================

/// First [`TEASER_LEN`] characters of `text`
pub fn teaser(text: &str) -> String {
    text.chars().take(TEASER_LEN).collect()
}

/// Public URL of an uploaded image
pub fn image_url(image: Option<&str>, media_url: &str) -> Option<String> {
    let image = image?.trim_start_matches('/');
    if image.is_empty() {
        return None;
    }

    if media_url.ends_with('/') {
        Some(format!("{}{}", media_url, image))
    } else {
        Some(format!("{}/{}", media_url, image))
    }
}

fn first_tag_title(post: &PostWithMeta) -> Option<String> {
    post.first_tag().map(|t| t.tag.title.clone())
}

pub fn serialize_tag(tag: &TagWithCount) -> TagResponse {
    TagResponse {
        title: tag.tag.title.clone(),
        posts_with_tag: tag.post_count,
    }
}

pub fn serialize_post(post: &PostWithMeta, media_url: &str) -> PostResponse {
    PostResponse {
        title: post.post.title.clone(),
        teaser_text: teaser(&post.post.text),
        teaser_truncated: post.post.text.chars().count() > TEASER_LEN,
        author: post.post.author_username.clone(),
        comments_amount: post.comment_count,
        image_url: image_url(post.post.image.as_deref(), media_url),
        published_at: post.post.published_at.to_rfc3339(),
        slug: post.post.slug.clone(),
        tags: post.tags.iter().map(serialize_tag).collect(),
        first_tag_title: first_tag_title(post),
    }
}

pub fn serialize_post_short(post: &PostWithMeta) -> PostShortResponse {
    PostShortResponse {
        title: post.post.title.clone(),
        author: post.post.author_username.clone(),
        published_at: post.post.published_at.to_rfc3339(),
        slug: post.post.slug.clone(),
    }
}

pub fn serialize_post_short_index(post: &PostWithMeta, media_url: &str) -> PostShortIndexResponse {
    PostShortIndexResponse {
        title: post.post.title.clone(),
        image_url: image_url(post.post.image.as_deref(), media_url),
        published_at: post.post.published_at.to_rfc3339(),
        slug: post.post.slug.clone(),
        first_tag_title: first_tag_title(post),
    }
}

pub fn serialize_comment(comment: &CommentWithAuthor) -> CommentResponse {
    CommentResponse {
        text: comment.comment.text.clone(),
        published_at: comment.comment.published_at.to_rfc3339(),
        author: comment.author_username.clone(),
    }
}

pub fn serialize_post_detail(
    post: &PostWithMeta,
    comments: &[CommentWithAuthor],
    media_url: &str,
) -> PostDetailResponse {
    PostDetailResponse {
        title: post.post.title.clone(),
        text: post.post.text.clone(),
        author: post.post.author_username.clone(),
        comments: comments.iter().map(serialize_comment).collect(),
        likes_amount: post.like_count,
        image_url: image_url(post.post.image.as_deref(), media_url),
        published_at: post.post.published_at.to_rfc3339(),
        slug: post.post.slug.clone(),
        tags: post.tags.iter().map(serialize_tag).collect(),
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The teaser is a prefix of the text and never longer than the limit.
        #[test]
        fn teaser_is_bounded_prefix(text in "\\PC{0,400}") {
            let teaser_text = teaser(&text);

            prop_assert!(teaser_text.chars().count() <= TEASER_LEN);
            prop_assert!(text.starts_with(&teaser_text));
            if text.chars().count() <= TEASER_LEN {
                prop_assert_eq!(teaser_text, text);
            }
        }
    }
}
