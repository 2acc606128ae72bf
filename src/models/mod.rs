//! Data models
//!
//! Plain data structures shared by the repositories, services and web layer:
//! - Database entities (Post, Tag, Comment, User)
//! - Aggregated views (PostWithMeta, TagWithCount, CommentWithAuthor)
//! - Input types accepted by the services

mod comment;
mod post;
mod tag;
mod user;

pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use post::{CreatePostInput, Post, PostWithMeta, POST_SLUG_MAX_LEN, POST_TITLE_MAX_LEN};
pub use tag::{Tag, TagWithCount, TAG_TITLE_MAX_LEN};
pub use user::{CreateUserInput, User};
