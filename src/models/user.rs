//! User model
//!
//! Users are an external identity as far as the blog is concerned. Only the
//! fields the blog reads are modeled: the username shown next to posts and
//! comments, and the staff flag that gates authorship.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Staff members may author posts
    pub is_staff: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User. The ID is assigned by the database.
    pub fn new(username: String, is_staff: bool) -> Self {
        Self {
            id: 0,
            username,
            is_staff,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.username)
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl CreateUserInput {
    pub fn new(username: impl Into<String>, is_staff: bool) -> Self {
        Self {
            username: username.into(),
            is_staff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new("editor".to_string(), true);
        assert_eq!(user.id, 0);
        assert_eq!(user.username, "editor");
        assert!(user.is_staff);
    }

    #[test]
    fn test_user_display() {
        let user = User::new("reader".to_string(), false);
        assert_eq!(user.to_string(), "reader");
    }
}
