//! Tag model
//!
//! Tags are free-form lowercase labels attached to posts. Titles are unique
//! and limited to [`TAG_TITLE_MAX_LEN`] characters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a tag title, in characters
pub const TAG_TITLE_MAX_LEN: usize = 20;

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Lowercase title (unique)
    pub title: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag with the given title.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(title: String) -> Self {
        Self {
            id: 0,
            title,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Tag annotated with the number of posts carrying it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagWithCount {
    /// The tag itself
    #[serde(flatten)]
    pub tag: Tag,
    /// Number of posts with this tag
    pub post_count: i64,
}

impl TagWithCount {
    pub fn new(tag: Tag, post_count: i64) -> Self {
        Self { tag, post_count }
    }
}
