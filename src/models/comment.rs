//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub published_at: DateTime<Utc>,
}

/// Comment with the author's username and the post title joined in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_username: String,
    pub post_title: String,
}

impl fmt::Display for CommentWithAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} under {}", self.author_username, self.post_title)
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    /// Defaults to now when absent
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl CreateCommentInput {
    pub fn new(post_id: i64, author_id: i64, text: impl Into<String>) -> Self {
        Self {
            post_id,
            author_id,
            text: text.into(),
            published_at: None,
        }
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_display() {
        let comment = CommentWithAuthor {
            comment: Comment {
                id: 1,
                post_id: 2,
                author_id: 3,
                text: "Nice".to_string(),
                published_at: Utc::now(),
            },
            author_username: "alice".to_string(),
            post_title: "Hello world".to_string(),
        };

        assert_eq!(comment.to_string(), "alice under Hello world");
    }
}
